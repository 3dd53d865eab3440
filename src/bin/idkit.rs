//! IDKIT CLI — drive a portrait session from the command line
//!
//! Commands:
//!   idkit demo    — scripted session steering towards a hidden face
//!   idkit new     — start a session and save it
//!   idkit show    — print the current round of a saved session
//!   idkit select  — submit the witness's picks for the current round
//!   idkit undo    — go back one round
//!   idkit abort   — end a session without a final pick
//!   idkit export  — write the final portrait as a PGM image

use idkit_core::generative::{Attributes, Gallery, GenerativeAdapter, ProjectionDecoder};
use idkit_core::latent::{LatentId, LatentVector, Origin};
use idkit_core::{RoundOutcome, Session, SessionConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::sync::Arc;
use std::time::Instant;

const LATENT_DIM: usize = 32;
const IMAGE_SIDE: u32 = 24;
const MODEL_SEED: u64 = 0x1D_C0DE;
const DEMO_PORTRAIT: &str = "idkit-portrait.pgm";

fn print_usage() {
    println!(
        r#"
╔══════════════════════════════════════════════════════════════╗
║        IDKIT v0.1 — Interactive Portrait Reconstruction      ║
║        Latent-space search guided by a witness               ║
╚══════════════════════════════════════════════════════════════╝

Usage: idkit <command> [options]

Commands:
  demo    [rounds]                             Scripted session towards a hidden face
  new     <session.json> [config.json|quick|thorough] [--gallery <manifest.json> [traits...]]
                                               Start a session, optionally from
                                               gallery photos matching the traits
                                               (gender=female|male age=young|old
                                               hair=black|blond|brown|grey|bald
                                               glasses moustache beard)
  show    <session.json>                       Show the current round
  select  <session.json> <id-prefix>... [--final]
                                               Submit picks (--final: satisfied)
  undo    <session.json>                       Go back one round
  abort   <session.json>                       End the session
  export  <session.json> <out.pgm>             Write the final portrait

Examples:
  idkit demo 12
  idkit new case-042.json quick
  idkit new case-043.json --gallery mugshots/gallery.json gender=male hair=grey beard
  idkit select case-042.json 3fa2 91c0
  idkit select case-042.json 7d1e --final
  idkit export case-042.json suspect.pgm
"#
    );
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "demo" => cmd_demo(&args[2..]).await,
        "new" => cmd_new(&args[2..]),
        "show" => cmd_show(&args[2..]).await,
        "select" => cmd_select(&args[2..]),
        "undo" => cmd_undo(&args[2..]),
        "abort" => cmd_abort(&args[2..]),
        "export" => cmd_export(&args[2..]).await,
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
        }
    }
}

fn model() -> Arc<dyn GenerativeAdapter> {
    Arc::new(ProjectionDecoder::new(LATENT_DIM, IMAGE_SIDE, IMAGE_SIDE, MODEL_SEED))
}

fn load_session(path: &str) -> Option<Session> {
    match Session::load(path, model()) {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("  Failed to load {}: {}", path, e);
            None
        }
    }
}

fn save_session(session: &Session, path: &str) {
    if let Err(e) = session.save(path) {
        eprintln!("  Failed to save: {}", e);
    } else {
        println!("  Saved to {}", path);
    }
}

fn describe(vector: &LatentVector) -> String {
    let origin = match &vector.lineage().origin {
        Origin::Prior => "prior".to_string(),
        Origin::Reference { label } => format!("photo {}", label),
        Origin::Perturbation { parent } => format!("mutant of {}", parent.short()),
        Origin::Blend { parents } => format!("blend of {}", parents.len()),
        Origin::Crossover { parent, partner } => {
            format!("cross {} x {}", parent.short(), partner.short())
        }
    };
    format!("gen {:>2}  {}", vector.generation(), origin)
}

fn print_round(session: &Session) {
    let population = match session.current() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {}", e);
            return;
        }
    };
    println!(
        "\n  Round {}/{}  [{:?}]",
        session.round(),
        session.config().max_rounds,
        session.state()
    );
    println!("  {}", "-".repeat(60));
    for (pos, candidate) in population.iter().enumerate() {
        let image = candidate
            .image
            .as_ref()
            .map(|img| img.digest()[..12].to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}. [{}] {:<28} latent {}  image {}",
            pos + 1,
            candidate.id().short(),
            describe(&candidate.vector),
            &candidate.vector.fingerprint()[..12],
            image
        );
    }
    if let Some(portrait) = session.final_candidate() {
        println!("\n  Final portrait: [{}]", portrait.id().short());
    }
}

fn cmd_new(args: &[String]) {
    if args.is_empty() {
        eprintln!(
            "Usage: idkit new <session.json> [config.json|quick|thorough] [--gallery <manifest.json> [traits...]]"
        );
        return;
    }
    let (options, gallery_args) = match args.iter().skip(1).position(|a| a == "--gallery") {
        Some(i) => (&args[1..i + 1], Some(&args[i + 2..])),
        None => (&args[1..], None),
    };
    let config = match options.first().map(|s| s.as_str()) {
        None => SessionConfig::default(),
        Some("quick") => SessionConfig::quick(),
        Some("thorough") => SessionConfig::thorough(),
        Some(path) => match SessionConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("  {}", e);
                return;
            }
        },
    };

    let started = match gallery_args {
        None => Session::start(config, model()),
        Some(rest) => {
            let Some((manifest, terms)) = rest.split_first() else {
                eprintln!("  --gallery needs a manifest path");
                return;
            };
            let loaded = Gallery::load(manifest)
                .and_then(|gallery| Attributes::parse_terms(terms).map(|query| (gallery, query)));
            match loaded {
                Ok((gallery, query)) => {
                    let matches = gallery.matching(&query);
                    println!("  {} of {} gallery photos match", matches.len(), gallery.len());
                    Session::start_from_references(config, model(), &matches)
                }
                Err(e) => {
                    eprintln!("  {}", e);
                    return;
                }
            }
        }
    };

    match started {
        Ok(session) => {
            print_round(&session);
            save_session(&session, &args[0]);
        }
        Err(e) => eprintln!("  Could not start session: {}", e),
    }
}

async fn cmd_show(args: &[String]) {
    if args.is_empty() {
        eprintln!("Usage: idkit show <session.json>");
        return;
    }
    let Some(mut session) = load_session(&args[0]) else {
        return;
    };
    if !session.state().is_terminal() {
        if let Err(e) = session.render_current().await {
            eprintln!("  Rendering failed: {}", e);
        }
    }
    print_round(&session);
    println!("\n  History:");
    for entry in session.history().entries() {
        let picks = entry
            .selection
            .as_ref()
            .map(|s| {
                s.selected
                    .iter()
                    .map(LatentId::short)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| "(open)".to_string());
        println!(
            "    round {:>2}  {}  picks: {}",
            entry.round,
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            picks
        );
    }
}

fn cmd_select(args: &[String]) {
    if args.len() < 2 {
        eprintln!("Usage: idkit select <session.json> <id-prefix>... [--final]");
        return;
    }
    let Some(mut session) = load_session(&args[0]) else {
        return;
    };
    let satisfied = args[1..].iter().any(|a| a == "--final");

    let mut ids = Vec::new();
    for prefix in args[1..].iter().filter(|a| *a != "--final") {
        match session.current().and_then(|p| p.find_by_prefix(prefix)) {
            Ok(id) => ids.push(id),
            Err(e) => {
                eprintln!("  {}", e);
                return;
            }
        }
    }

    match session.submit_selection(&ids, satisfied) {
        Ok(RoundOutcome::Advanced { round }) => {
            println!("\n  Advanced to round {}", round);
            print_round(&session);
        }
        Ok(RoundOutcome::Finished { state, portrait }) => {
            println!(
                "\n  Session finished ({:?}): portrait [{}]",
                state,
                portrait.id().short()
            );
        }
        Err(e) => {
            eprintln!("  Selection rejected: {}", e);
            return;
        }
    }
    save_session(&session, &args[0]);
}

fn cmd_undo(args: &[String]) {
    if args.is_empty() {
        eprintln!("Usage: idkit undo <session.json>");
        return;
    }
    let Some(mut session) = load_session(&args[0]) else {
        return;
    };
    match session.undo() {
        Ok(_) => {
            print_round(&session);
            save_session(&session, &args[0]);
        }
        Err(e) => eprintln!("  Undo failed: {}", e),
    }
}

fn cmd_abort(args: &[String]) {
    if args.is_empty() {
        eprintln!("Usage: idkit abort <session.json>");
        return;
    }
    let Some(mut session) = load_session(&args[0]) else {
        return;
    };
    match session.abort() {
        Ok(()) => {
            println!("  Session aborted at round {}", session.round());
            save_session(&session, &args[0]);
        }
        Err(e) => eprintln!("  Abort failed: {}", e),
    }
}

async fn cmd_export(args: &[String]) {
    if args.len() < 2 {
        eprintln!("Usage: idkit export <session.json> <out.pgm>");
        return;
    }
    let Some(session) = load_session(&args[0]) else {
        return;
    };
    match session.render_portrait().await {
        Ok(image) => match image.write_pgm(&args[1]) {
            Ok(()) => println!(
                "  Exported {}x{} portrait to {}",
                image.width(),
                image.height(),
                args[1]
            ),
            Err(e) => eprintln!("  Failed to write {}: {}", args[1], e),
        },
        Err(e) => eprintln!("  Export failed: {}", e),
    }
}

async fn cmd_demo(args: &[String]) {
    let rounds: u32 = args.first().and_then(|s| s.parse().ok()).unwrap_or(15);
    println!(
        r#"
╔══════════════════════════════════════════════════════════════╗
║              IDKIT v0.1 — Scripted Demo                      ║
║       A simulated witness steers towards a hidden face       ║
╚══════════════════════════════════════════════════════════════╝
"#
    );

    let adapter = model();
    let mut config = SessionConfig::default().with_seed(7);
    config.population_size = 6;
    config.max_rounds = rounds.max(1);

    // The face the simulated witness remembers
    let mut witness_rng = StdRng::seed_from_u64(99);
    let target = match adapter.sample_prior(&mut witness_rng) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("  Model unavailable: {}", e);
            return;
        }
    };
    let distance = |v: &LatentVector| -> f64 { (v.components() - &target).norm() };

    let mut session = match Session::start(config, Arc::clone(&adapter)) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("  Could not start session: {}", e);
            return;
        }
    };

    println!("Step 1: Witness reviews candidates round by round...");
    println!("{}", "-".repeat(60));
    let outcome = loop {
        let started = Instant::now();
        if let Err(e) = session.render_current().await {
            eprintln!("  Rendering failed: {}", e);
            return;
        }
        let elapsed = started.elapsed();

        let mut ranked: Vec<(LatentId, f64)> = match session.current() {
            Ok(p) => p.vectors().map(|v| (v.id(), distance(v))).collect(),
            Err(e) => {
                eprintln!("  {}", e);
                return;
            }
        };
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (best, best_distance) = ranked[0];

        // Early rounds the witness is unsure and keeps two faces
        let satisfied = best_distance < 0.35;
        let picks: Vec<LatentId> = if session.round() < 2 && !satisfied {
            ranked.iter().take(2).map(|(id, _)| *id).collect()
        } else {
            vec![best]
        };
        println!(
            "  Round {:>2}: decoded in {:>4}ms, radius {:.3}, picked {} (closest {:.3})",
            session.round(),
            elapsed.as_millis(),
            session.config().variation.schedule().radius(session.round()),
            picks.len(),
            best_distance
        );

        match session.submit_selection(&picks, satisfied) {
            Ok(RoundOutcome::Advanced { .. }) => continue,
            Ok(RoundOutcome::Finished { state, portrait }) => break (state, portrait),
            Err(e) => {
                eprintln!("  Selection rejected: {}", e);
                return;
            }
        }
    };

    let (state, portrait) = outcome;
    println!("\nStep 2: Session outcome");
    println!("{}", "-".repeat(60));
    let start_distance = session
        .history()
        .get(0)
        .map(|e| {
            e.population
                .vectors()
                .map(&distance)
                .fold(f64::INFINITY, f64::min)
        })
        .unwrap_or(f64::NAN);
    println!("  State:             {:?}", state);
    println!("  Rounds:            {}", session.round() + 1);
    println!(
        "  Portrait:          [{}] {}",
        portrait.id().short(),
        describe(&portrait.vector)
    );
    println!(
        "  Distance to face:  {:.3} (best in round 0: {:.3})",
        distance(&portrait.vector),
        start_distance
    );

    println!("\nStep 3: Undo and replay an advance");
    println!("{}", "-".repeat(60));
    replay_check(Arc::clone(&adapter));

    println!("\nStep 4: Export");
    println!("{}", "-".repeat(60));
    match session.render_portrait().await {
        Ok(image) => match image.write_pgm(DEMO_PORTRAIT) {
            Ok(()) => println!(
                "  Wrote {}x{} portrait to {}",
                image.width(),
                image.height(),
                DEMO_PORTRAIT
            ),
            Err(e) => eprintln!("  Failed to write {}: {}", DEMO_PORTRAIT, e),
        },
        Err(e) => eprintln!("  Export failed: {}", e),
    }
}

/// Advance, undo, and advance again with the same picks
fn replay_check(adapter: Arc<dyn GenerativeAdapter>) {
    let mut session = match Session::start(SessionConfig::quick().with_seed(11), adapter) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("  {}", e);
            return;
        }
    };
    let picks: Vec<LatentId> = match session.current() {
        Ok(p) => p.ids().into_iter().take(2).collect(),
        Err(e) => {
            eprintln!("  {}", e);
            return;
        }
    };

    if let Err(e) = session.submit_selection(&picks, false) {
        eprintln!("  Replay failed: {}", e);
        return;
    }
    let first = session.history().resulting_population(0).cloned();
    let replayed = session
        .undo()
        .map(|_| ())
        .and_then(|_| session.submit_selection(&picks, false))
        .map(|_| session.history().resulting_population(0).cloned());

    match (first, replayed) {
        (Some(a), Ok(Some(b))) => println!(
            "  Replayed round 1: {} candidates, identical population: {}",
            b.len(),
            a == b
        ),
        (_, Err(e)) => eprintln!("  Replay failed: {}", e),
        _ => eprintln!("  Replay failed: round 1 missing from history"),
    }
}
