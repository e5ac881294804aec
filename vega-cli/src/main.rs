use vega_cli::{config, init, run, tui, BudgetOverrides, CliError};

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    if let Err(err) = run_cli() {
        match err {
            CliError::Runtime(msg) => eprintln!("Runtime error: {msg}"),
            other => eprintln!("vega: {other}"),
        }
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), CliError> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        print_usage();
        return Ok(());
    }

    match args[0].as_str() {
        "init" => {
            args.remove(0);
            let name = args.first().map(String::as_str);
            init::run(name)
        }
        "tui" => {
            args.remove(0);
            let path = args.first().map(String::as_str);
            tui::run(path)
        }
        _ => run_program(args),
    }
}

fn run_program(mut args: Vec<String>) -> Result<(), CliError> {
    let path = args.remove(0);

    let mut debug = false;
    let mut budget = BudgetOverrides::default();

    while let Some(flag) = args.first().cloned() {
        args.remove(0);
        match flag.as_str() {
            "--debug" => debug = true,
            "--budget-cost" => {
                let raw = take_arg("--budget-cost", &mut args)?;
                budget.max_cost_usd =
                    Some(raw.parse().map_err(|_| CliError::Usage(format!("--budget-cost: not a number: {raw}")))?);
            }
            "--budget-input" => {
                let raw = take_arg("--budget-input", &mut args)?;
                budget.max_input_tokens =
                    Some(raw.parse().map_err(|_| CliError::Usage(format!("--budget-input: not an integer: {raw}")))?);
            }
            "--budget-output" => {
                let raw = take_arg("--budget-output", &mut args)?;
                budget.max_output_tokens =
                    Some(raw.parse().map_err(|_| CliError::Usage(format!("--budget-output: not an integer: {raw}")))?);
            }
            other => return Err(CliError::Usage(format!("unknown flag: {other}"))),
        }
    }

    let bytes = std::fs::read(&path)?;
    let image = vega_bytecode::Image::load(&bytes)?;
    let api_key = config::resolve_api_key();
    if api_key.is_none() {
        eprintln!("warning: no ANTHROPIC_API_KEY set (checked the environment and $HOME/.vega); agent sends will fail");
    }

    run::run_image(image, api_key, budget, debug)
}

fn take_arg(flag: &str, remaining: &mut Vec<String>) -> Result<String, CliError> {
    if remaining.is_empty() {
        return Err(CliError::Usage(format!("missing value for {flag}")));
    }
    Ok(remaining.remove(0))
}

fn print_usage() {
    println!(
        "vega <file.vgb> [--debug] [--budget-cost F] [--budget-input N] [--budget-output N]\n\
vega init [name]\n\
vega tui [file.vgb]"
    );
}
