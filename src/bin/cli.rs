// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyframe IOB CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use nalgebra::Vector3;
use polyframe_iob::geometry::analytics;
use polyframe_iob::iob::CONFIG_FILE;
use polyframe_iob::{io, BooleanEngine, BooleanOp, BooleanOutput, Environment, Operand, Primitive};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "polyframe-iob")]
#[command(about = "Inside/outside/boundary boolean operations on STL meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Environment file (defaults to ./iob.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Union of two STL meshes
    Union(BooleanArgs),

    /// Subtract the second STL mesh from the first
    Difference(BooleanArgs),

    /// Intersection of two STL meshes
    Intersection(BooleanArgs),

    /// Run all three operations on two overlapping cubes
    Demo {
        /// Directory receiving the result meshes
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Print volume, area and watertightness of an STL mesh
    Analyze {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Write the active environment as TOML
    Config {
        #[arg(short, long, default_value = CONFIG_FILE)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct BooleanArgs {
    /// First operand
    #[arg(value_name = "A")]
    first: PathBuf,

    /// Second operand
    #[arg(value_name = "B")]
    second: PathBuf,

    /// Output STL file
    #[arg(short, long)]
    output: PathBuf,

    /// Translation applied to the second operand
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    offset: Option<Vec<f64>>,

    /// Print operation statistics as JSON
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let env = match &cli.config {
        Some(path) => Environment::from_file(path)?,
        None => Environment::load()?,
    };

    match &cli.command {
        Commands::Union(args) => boolean_command(BooleanOp::Union, args, env, cli.verbose),
        Commands::Difference(args) => {
            boolean_command(BooleanOp::Difference, args, env, cli.verbose)
        }
        Commands::Intersection(args) => {
            boolean_command(BooleanOp::Intersection, args, env, cli.verbose)
        }
        Commands::Demo { out } => demo_command(out, env),
        Commands::Analyze { input } => analyze_command(input),
        Commands::Config { output } => {
            env.save(output)?;
            println!("{} {}", "Wrote".green(), output.display());
            Ok(())
        }
    }
}

fn boolean_command(op: BooleanOp, args: &BooleanArgs, env: Environment, verbose: bool) -> Result<()> {
    let first = io::load_stl(&args.first)?;
    let second = io::load_stl(&args.second)?;
    if verbose {
        println!(
            "{} {} ({} triangles) {} {} ({} triangles)",
            "Loaded".bright_black(),
            args.first.display(),
            first.triangle_count(),
            op.to_string().bold(),
            args.second.display(),
            second.triangle_count()
        );
    }

    let mut second_operand = Operand::new(&second);
    if let Some(offset) = &args.offset {
        second_operand = second_operand.translated(Vector3::new(offset[0], offset[1], offset[2]));
    }

    let engine = BooleanEngine::new(env);
    let output = engine
        .apply_operands(op, &Operand::new(&first), &second_operand)
        .with_context(|| format!("{} failed", op))?;

    report(op, &output, verbose);
    io::save_stl(&output.mesh, &args.output)?;
    println!("{} {}", "Wrote".green(), args.output.display());

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&output.stats)?);
    }
    Ok(())
}

fn demo_command(out: &Path, env: Environment) -> Result<()> {
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory: {:?}", out))?;

    let cube = Primitive::unit_cube().to_mesh();
    let first = Operand::new(&cube);
    let second = Operand::new(&cube).translated(Vector3::new(0.5, 0.5, 0.5));
    let engine = BooleanEngine::new(env);

    for op in [BooleanOp::Union, BooleanOp::Difference, BooleanOp::Intersection] {
        let output = engine.apply_operands(op, &first, &second)?;
        report(op, &output, true);
        let path = out.join(format!("demo_{}.stl", op));
        io::save_stl(&output.mesh, &path)?;
        println!("  {} {}", "→".bright_black(), path.display().to_string().cyan());
    }
    Ok(())
}

fn analyze_command(input: &Path) -> Result<()> {
    let mesh = io::load_stl(input)?;
    println!("{} {}", "File:".bold(), input.display().to_string().cyan());
    analytics::analyze(&mesh).print();
    Ok(())
}

fn report(op: BooleanOp, output: &BooleanOutput, verbose: bool) {
    let volume = analytics::signed_volume(&output.mesh);
    println!(
        "{} {} triangles, volume {:.6}",
        format!("{}:", op).bold(),
        output.mesh.triangle_count().to_string().cyan(),
        volume
    );

    if output.has_issues() {
        println!("  {} {} recovered issue(s)", "⚠".yellow(), output.issues.len());
        if verbose {
            for issue in &output.issues {
                println!("    {}", issue.to_string().bright_black());
            }
        }
    }
    if verbose {
        output.stats.print_summary();
    }
}
