use crate::config::KnowledgeBase;
use crate::{KnockoutArgs, SimulateArgs};
use anyhow::{bail, Context, Result};
use regflux_core::{
    analysis,
    logger::TrajectoryLogger,
    optimize::{
        bind::FbaSession,
        knockout::{KnockoutScreen, ScreenProgress},
        solver::IntervalOptimizer,
    },
    regulation::{attractor::SearchConfig, builder::NetworkBuilder},
};
use std::{fs, path::Path};

/// Builds a prepared session from the knowledge base.
fn build_session(
    kb: &KnowledgeBase,
    max_iterations: usize,
) -> Result<FbaSession<IntervalOptimizer>> {
    let mut session = FbaSession::new(IntervalOptimizer::new());
    session.set_network(kb.network.clone());
    session.set_search_config(SearchConfig { max_iterations });

    for bound in &kb.base_constraints {
        if bound.lower_bound > bound.upper_bound {
            bail!(
                "invalid bound for '{}': lower {} exceeds upper {}",
                bound.entity_id,
                bound.lower_bound,
                bound.upper_bound
            );
        }
        session.add_base_constraint(bound.to_constraint());
    }

    if let Some(entities) = &kb.regulation {
        let regulation = NetworkBuilder::new()
            .with_entities(entities.clone())
            .build()
            .context("Failed to build the interaction network")?;
        session.set_regulation(regulation);
    }

    session
        .prepare_solver()
        .context("Failed to prepare the solver")?;
    Ok(session)
}

fn create_run_dir(base: &str, label: &str) -> Result<String> {
    let out_dir = format!(
        "{}/{}_{}",
        base,
        label,
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir))?;
    Ok(out_dir)
}

pub fn run_simulation(args: &SimulateArgs) -> Result<()> {
    println!("\n--- [Workflow] Starting Attractor Simulation ---");

    let kb = KnowledgeBase::load(
        &args.model,
        args.constraints.as_deref(),
        Some(args.regulation.as_str()),
    )?;
    let out_dir = create_run_dir(&args.out_dir, "simulate")?;

    // Copy the regulation file into the run directory for traceability.
    fs::copy(
        &args.regulation,
        Path::new(&out_dir).join("regulation.yaml"),
    )?;

    let mut session = build_session(&kb, args.max_iterations)?;

    let log_path = Path::new(&out_dir).join("trajectory.csv");
    let mut logger = TrajectoryLogger::new(&log_path.to_string_lossy())
        .with_context(|| format!("Failed to open trajectory log at {:?}", log_path))?;

    let attractor = session
        .evaluate_regulation(Some(&mut logger))
        .context("Attractor search failed")?;

    println!(
        "Visited {} distinct states; cycle of length {} starting at state {}.",
        attractor.trajectory.len(),
        attractor.cycle().len(),
        attractor.cycle_start
    );
    for (index, state) in attractor.trajectory.iter().enumerate() {
        let marker = if index >= attractor.cycle_start { "*" } else { " " };
        let levels: Vec<String> = state
            .iter()
            .map(|(id, level)| format!("{}={}", id, level))
            .collect();
        println!("  {}[{}] {}", marker, index, levels.join(", "));
    }

    println!("Steady-state constraints:");
    for constraint in &attractor.steady_constraints {
        if let Some((id, _)) = constraint.single_entity() {
            println!(
                "  {}: [{}, {}]",
                id, constraint.lower_bound, constraint.upper_bound
            );
        }
    }
    let steady_path = Path::new(&out_dir).join("steady_constraints.json");
    fs::write(
        &steady_path,
        serde_json::to_string_pretty(&attractor.steady_constraints)?,
    )
    .with_context(|| format!("Failed to write {:?}", steady_path))?;

    let result = session
        .solve(&[], !args.minimize, false)
        .context("Final optimization failed")?;
    match result.objective {
        Some(objective) => println!("Objective under regulation: {} ({})", objective, result.status),
        None => println!("Optimization did not produce an objective ({})", result.status),
    }

    println!("\nSimulation complete. Results are in '{}'", out_dir);
    Ok(())
}

pub fn run_knockout_screen(args: &KnockoutArgs) -> Result<()> {
    println!("\n--- [Workflow] Starting Knockout Screen ---");

    let kb = KnowledgeBase::load(
        &args.model,
        args.constraints.as_deref(),
        args.regulation.as_deref(),
    )?;
    let out_dir = create_run_dir(&args.out_dir, "knockout")?;

    let mut session = build_session(&kb, args.max_iterations)?;
    if session.regulation().is_some() {
        session
            .evaluate_regulation(None)
            .context("Initial attractor search failed")?;
    }

    let targets = knockout_targets(args, &kb)?;
    println!("Screening {} knockout targets...", targets.len());

    let maximize = !args.minimize;
    let wild_type = session
        .solve(&[], maximize, false)
        .context("Wild-type optimization failed")?;
    let wild_type_objective = match wild_type.objective {
        Some(objective) => objective,
        None => bail!("Wild-type optimization failed: {}", wild_type.status),
    };
    println!("Wild-type objective: {}", wild_type_objective);

    let screen = KnockoutScreen {
        workers: args.workers.max(1),
        maximize,
    };
    let progress = ScreenProgress::new();
    let outcome = screen.run(&session, &targets, &progress);
    println!(
        "Screened {} of {} targets.",
        progress.completed(),
        targets.len()
    );

    let csv_path = Path::new(&out_dir).join("screen.csv");
    analysis::write_screen_csv(&csv_path.to_string_lossy(), &outcome.records)?;

    let report = analysis::classify_knockouts(
        &outcome.records,
        wild_type_objective,
        analysis::EssentialityThresholds::default(),
    );
    println!(
        "Essential: {}, impaired: {}, unaffected: {}",
        report.essential.len(),
        report.impaired.len(),
        report.unaffected.len()
    );
    for entity_id in &report.essential {
        println!("  essential: {}", entity_id);
    }

    if let Some(failure) = outcome.failure {
        return Err(failure).context("Knockout screen aborted early");
    }

    println!("\nScreen complete. Results are in '{}'", out_dir);
    Ok(())
}

fn knockout_targets(args: &KnockoutArgs, kb: &KnowledgeBase) -> Result<Vec<String>> {
    if let Some(path) = &args.targets {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read targets file: {}", path))?;
        return Ok(content
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect());
    }
    if let Some(entities) = &kb.regulation {
        return Ok(entities.iter().map(|e| e.id.clone()).collect());
    }
    Ok(kb.network.reactions.iter().map(|r| r.id.clone()).collect())
}
