mod error;

use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cp_core::ensure_finite;
use cp_dynamics::state::{
    STATE_SIZE, augment_rows, augment_slice, reduce_rows, reduce_state,
};
use cp_dynamics::{
    AugmentedState, CartpoleConfig, CartpoleDynamics, Control, CpError, Dynamics, StepHessians,
};
use nalgebra::{DMatrix, SMatrix};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CliError, CliResult};

const DEFAULT_DT: f64 = 0.01;

#[derive(Parser)]
#[command(name = "cp-cli")]
#[command(about = "Cart-pole dynamics CLI - evaluate and linearize the cart-pole model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// YAML file with model parameters (only `dt` is required)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Time step in seconds, overrides the config file
    #[arg(long)]
    dt: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective model parameters as YAML
    ShowConfig {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Advance the model from a state, one step per control value
    Step {
        #[command(flatten)]
        model: ModelArgs,
        /// Comma-separated state
        #[arg(long, allow_hyphen_values = true)]
        state: String,
        /// Raw control; repeat for a multi-step rollout
        #[arg(long, required = true, allow_negative_numbers = true)]
        control: Vec<f64>,
        /// Read and print states as [x, x', theta, theta']
        #[arg(long)]
        reduced: bool,
    },
    /// Evaluate the next state and its derivatives
    Linearize {
        #[command(flatten)]
        model: ModelArgs,
        /// Comma-separated state
        #[arg(long, allow_hyphen_values = true)]
        state: String,
        /// Raw control
        #[arg(long, allow_negative_numbers = true)]
        control: f64,
        /// State is given as [x, x', theta, theta']
        #[arg(long)]
        reduced: bool,
        /// Also compute second derivatives
        #[arg(long)]
        hessians: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Convert reduced states to augmented states
    Augment {
        /// One comma-separated [x, x', theta, theta'] per argument
        #[arg(required = true, allow_hyphen_values = true)]
        states: Vec<String>,
    },
    /// Convert augmented states to reduced states
    Reduce {
        /// One comma-separated [x, x', sin, cos, theta'] per argument
        #[arg(required = true, allow_hyphen_values = true)]
        states: Vec<String>,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ShowConfig { model } => cmd_show_config(&model),
        Commands::Step {
            model,
            state,
            control,
            reduced,
        } => cmd_step(&model, &state, &control, reduced),
        Commands::Linearize {
            model,
            state,
            control,
            reduced,
            hessians,
            json,
        } => cmd_linearize(&model, &state, control, reduced, hessians, json),
        Commands::Augment { states } => {
            let out = augment_rows(&parse_rows(&states, "reduced state")?)?;
            print_rows(&out);
            Ok(())
        }
        Commands::Reduce { states } => {
            let out = reduce_rows(&parse_rows(&states, "augmented state")?)?;
            print_rows(&out);
            Ok(())
        }
    }
}

fn cmd_show_config(args: &ModelArgs) -> CliResult<()> {
    let config = load_config(args)?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

fn cmd_step(args: &ModelArgs, state: &str, controls: &[f64], reduced: bool) -> CliResult<()> {
    let config = load_config(args)?;
    let model = CartpoleDynamics::new(config);
    let mut x = initial_state(&parse_values(state, "state")?, reduced)?;
    for &u in controls {
        ensure_finite(u, "control")?;
    }

    info!(steps = controls.len(), "rolling out cart-pole");
    print_state(0, &x, reduced);
    for (k, &u) in controls.iter().enumerate() {
        x = model.step(&x, &Control::new(u));
        print_state(k + 1, &x, reduced);
    }
    Ok(())
}

#[derive(Serialize)]
struct Linearization {
    state: Vec<f64>,
    control: f64,
    next: Vec<f64>,
    f_x: Vec<Vec<f64>>,
    f_u: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    f_xx: Option<Vec<Vec<Vec<f64>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    f_ux: Option<Vec<Vec<Vec<f64>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    f_uu: Option<Vec<Vec<Vec<f64>>>>,
}

fn cmd_linearize(
    args: &ModelArgs,
    state: &str,
    control: f64,
    reduced: bool,
    hessians: bool,
    json: bool,
) -> CliResult<()> {
    let config = load_config(args)?;
    let model = if hessians {
        CartpoleDynamics::with_hessians(config)
    } else {
        CartpoleDynamics::new(config)
    };
    let x = initial_state(&parse_values(state, "state")?, reduced)?;
    let u = Control::new(ensure_finite(control, "control")?);

    let report = linearize(&model, &x, &u);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_linearization(&report));
    }
    Ok(())
}

fn linearize(model: &CartpoleDynamics, x: &AugmentedState, u: &Control) -> Linearization {
    let jac = model.jacobians(x, u);
    let hess = model.hessians(x, u);
    let blocks = |pick: fn(&StepHessians<5, 1>) -> Vec<Vec<Vec<f64>>>| hess.as_ref().map(pick);

    Linearization {
        state: x.iter().copied().collect(),
        control: u[0],
        next: model.step(x, u).iter().copied().collect(),
        f_x: matrix_rows(&jac.f_x),
        f_u: matrix_rows(&jac.f_u),
        f_xx: blocks(|h| h.f_xx.iter().map(matrix_rows).collect()),
        f_ux: blocks(|h| h.f_ux.iter().map(matrix_rows).collect()),
        f_uu: blocks(|h| h.f_uu.iter().map(matrix_rows).collect()),
    }
}

fn load_config(args: &ModelArgs) -> CliResult<CartpoleConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
                path: path.clone(),
                source,
            })?;
            serde_yaml::from_str(&text).map_err(|source| CliError::ConfigParse {
                path: path.clone(),
                source,
            })?
        }
        None => CartpoleConfig::new(DEFAULT_DT),
    };
    if let Some(dt) = args.dt {
        config.dt = dt;
    }

    ensure_finite(config.dt, "dt")?;
    ensure_finite(config.min_bounds, "min_bounds")?;
    ensure_finite(config.max_bounds, "max_bounds")?;
    ensure_finite(config.mc, "mc")?;
    ensure_finite(config.mp, "mp")?;
    ensure_finite(config.l, "l")?;
    ensure_finite(config.g, "g")?;
    debug!(?config, "model config");
    Ok(config)
}

fn parse_values(text: &str, what: &'static str) -> CliResult<Vec<f64>> {
    text.split(',')
        .map(|s| {
            let s = s.trim();
            let v: f64 = s.parse().map_err(|_| CliError::Number {
                what,
                value: s.to_string(),
            })?;
            Ok(ensure_finite(v, what)?)
        })
        .collect()
}

/// Parse one row per argument into a matrix; every row must have the same width.
fn parse_rows(rows: &[String], what: &'static str) -> CliResult<DMatrix<f64>> {
    let parsed = rows
        .iter()
        .map(|r| parse_values(r, what))
        .collect::<CliResult<Vec<_>>>()?;
    let ncols = parsed.first().map_or(0, Vec::len);
    if let Some(bad) = parsed.iter().find(|r| r.len() != ncols) {
        return Err(CpError::shape(what, ncols, bad.len()).into());
    }
    let flat: Vec<f64> = parsed.into_iter().flatten().collect();
    Ok(DMatrix::from_row_slice(rows.len(), ncols, &flat))
}

fn initial_state(values: &[f64], reduced: bool) -> CliResult<AugmentedState> {
    if reduced {
        return Ok(augment_slice(values)?);
    }
    if values.len() != STATE_SIZE {
        return Err(CpError::shape("augmented state", STATE_SIZE, values.len()).into());
    }
    Ok(AugmentedState::from_column_slice(values))
}

fn matrix_rows<const R: usize, const C: usize>(m: &SMatrix<f64, R, C>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}

fn join(values: impl IntoIterator<Item = f64>) -> String {
    values
        .into_iter()
        .map(|v| format!("{v:.9}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_state(k: usize, x: &AugmentedState, reduced: bool) {
    if reduced {
        println!("{k:>5}: [{}]", join(reduce_state(x).iter().copied()));
    } else {
        println!("{k:>5}: [{}]", join(x.iter().copied()));
    }
}

fn print_rows(m: &DMatrix<f64>) {
    for row in m.row_iter() {
        println!("{}", join(row.iter().copied()));
    }
}

/// Text form of a linearization: `next`, `f_x`, `f_u` and, when present,
/// every `f_xx[i]`, `f_ux[i]` and `f_uu[i]` block.
fn render_linearization(report: &Linearization) -> String {
    let mut out = format!("next: [{}]\n", join(report.next.iter().copied()));
    push_block(&mut out, "f_x", &report.f_x);
    push_block(&mut out, "f_u", &report.f_u);
    for (name, blocks) in [
        ("f_xx", &report.f_xx),
        ("f_ux", &report.f_ux),
        ("f_uu", &report.f_uu),
    ] {
        for (i, block) in blocks.iter().flatten().enumerate() {
            push_block(&mut out, &format!("{name}[{i}]"), block);
        }
    }
    out
}

fn push_block(out: &mut String, label: &str, rows: &[Vec<f64>]) {
    out.push_str(label);
    out.push_str(":\n");
    for row in rows {
        out.push_str(&format!("  [{}]\n", join(row.iter().copied())));
    }
}
