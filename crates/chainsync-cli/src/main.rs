use chainsync_core::{
    job_path, remove_job, rename_job, sync_scheduler, CommandContext, CommandStatus, Config,
    ConfigOverrides, ExecutionOutcome,
};
use clap::Parser;
use color_eyre::Result;
use serde_json::{json, Value};

mod cli;

use cli::{ChainsyncCli, CommandCli};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = ChainsyncCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let outcome = match run(&cli) {
        Ok(outcome) => outcome,
        Err(err) => ExecutionOutcome::failure(format!("{err:#}"), json!({ "reason": "error" })),
    };
    let code = emit_output(&cli, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("chainsync={level},chainsync_core={level},chainsync_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: &ChainsyncCli) -> anyhow::Result<ExecutionOutcome> {
    let overrides = ConfigOverrides {
        live_folder: cli.live_folder.clone(),
        store: cli.store.clone(),
        on_malformed: cli.on_malformed,
    };
    let config = match Config::from_env(&overrides) {
        Ok(config) => config,
        Err(err) => {
            return Ok(ExecutionOutcome::user_error(
                err.to_string(),
                json!({ "reason": "invalid_config" }),
            ))
        }
    };

    if let CommandCli::Path(args) = &cli.command {
        return Ok(job_path(&config, &args.scheduler, args.name.as_deref()));
    }

    let ctx = CommandContext::open(config)?;
    match &cli.command {
        CommandCli::Sync(args) => sync_scheduler(&ctx, &args.scheduler),
        CommandCli::Rename(args) => rename_job(&ctx, &args.scheduler, &args.from, &args.to),
        CommandCli::Remove(args) => remove_job(&ctx, &args.scheduler, &args.name),
        CommandCli::Path(args) => Ok(job_path(
            ctx.config(),
            &args.scheduler,
            args.name.as_deref(),
        )),
    }
}

fn emit_output(cli: &ChainsyncCli, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();

    if cli.json {
        let payload = json!({
            "status": outcome.status.as_str(),
            "message": outcome.message,
            "details": outcome.details,
            "code": code,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if outcome.status != CommandStatus::Ok {
        eprintln!("chainsync: {}", outcome.message);
        if let Some(path) = detail_str(&outcome.details, "path") {
            eprintln!("  at {path}");
        }
    } else if !cli.quiet {
        if is_passthrough(&outcome.details) {
            println!("{}", outcome.message);
        } else {
            println!("chainsync: {}", outcome.message);
            for line in job_lines(&outcome.details) {
                println!("  {line}");
            }
        }
    }

    Ok(code)
}

fn detail_str<'a>(details: &'a Value, key: &str) -> Option<&'a str> {
    details
        .as_object()
        .and_then(|map| map.get(key))
        .and_then(Value::as_str)
}

fn is_passthrough(details: &Value) -> bool {
    details
        .as_object()
        .and_then(|map| map.get("passthrough"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn job_lines(details: &Value) -> Vec<String> {
    let Some(jobs) = details.get("jobs").and_then(Value::as_array) else {
        return Vec::new();
    };
    jobs.iter()
        .filter_map(|job| {
            let name = job.get("name")?.as_str()?;
            match job.get("title").and_then(Value::as_str) {
                Some(title) => Some(format!("{name} ({title})")),
                None => Some(name.to_string()),
            }
        })
        .collect()
}
