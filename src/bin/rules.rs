use std::{
    error::Error,
    fs::{self, File},
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
    process::exit,
};

use clap::{Parser, Subcommand};

use budget_rules::{
    EngineConfig, ExecutionSummary, Rule, RuleEngine, RuleStatus, Transaction, import_rules,
    read_transactions_csv, setup_logging, test_rule, validate_rule, write_transactions_csv,
};

/// A utility for applying categorization rules to bank transactions.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log level to use when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply the rules in a rule export to a CSV file of transactions.
    Apply {
        /// File path to a JSON rule export.
        #[arg(long)]
        rules: PathBuf,

        /// File path to a CSV file of transactions.
        #[arg(long)]
        transactions: PathBuf,

        /// File path to a JSON file listing the allowed categories and flags.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where to write the updated transactions. Defaults to stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Where to write the execution records as JSON.
        #[arg(long)]
        executions: Option<PathBuf>,

        /// Run every imported rule. Imported rules are inactive otherwise.
        #[arg(long)]
        activate: bool,
    },
    /// Check that a rule export can be imported.
    Validate {
        /// File path to a JSON rule export.
        #[arg(long)]
        rules: PathBuf,
    },
    /// Dry run every rule in a rule export against one transaction.
    Test {
        /// File path to a JSON rule export.
        #[arg(long)]
        rules: PathBuf,

        /// The transaction payee.
        #[arg(long)]
        payee: String,

        /// The transaction amount, negative for expenses.
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,

        /// The transaction date, e.g. 2025-01-15.
        #[arg(long)]
        date: String,

        /// The transaction memo.
        #[arg(long, default_value = "")]
        memo: String,

        /// The transaction account name.
        #[arg(long, default_value = "")]
        account: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    match args.command {
        Command::Apply {
            rules,
            transactions,
            config,
            output,
            executions,
            activate,
        } => apply(
            &rules,
            &transactions,
            config.as_deref(),
            output.as_deref(),
            executions.as_deref(),
            activate,
        ),
        Command::Validate { rules } => validate(&rules),
        Command::Test {
            rules,
            payee,
            amount,
            date,
            memo,
            account,
        } => {
            let transaction = Transaction::build(&payee, amount, &date)
                .memo(&memo)
                .account(&account)
                .finalise();
            dry_run(&rules, &transaction)
        }
    }
}

fn load_rules(path: &Path) -> Result<Vec<Rule>, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let rules = import_rules(&text)?;
    tracing::info!("Loaded {} rules from {path:?}", rules.len());

    Ok(rules)
}

fn apply(
    rules_path: &Path,
    transactions_path: &Path,
    config_path: Option<&Path>,
    output_path: Option<&Path>,
    executions_path: Option<&Path>,
    activate: bool,
) -> Result<(), Box<dyn Error>> {
    let mut rules = load_rules(rules_path)?;

    if activate {
        for rule in &mut rules {
            rule.status = RuleStatus::Active;
        }
    } else {
        tracing::warn!("Imported rules are inactive, pass --activate to run them");
    }

    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = RuleEngine::new(config);

    let transactions = read_transactions_csv(BufReader::new(File::open(transactions_path)?))?;
    let outcomes = engine.process_batch(&transactions, &rules)?;

    let summary = ExecutionSummary::from_records(
        outcomes.iter().flat_map(|outcome| outcome.executions.iter()),
    );
    tracing::info!(
        "Processed {} transactions: {} rule executions succeeded, {} failed",
        outcomes.len(),
        summary.succeeded,
        summary.failed
    );
    for (rule_id, tally) in &summary.by_rule {
        tracing::debug!(
            "rule {rule_id}: {} succeeded, {} failed",
            tally.succeeded,
            tally.failed
        );
    }

    let updated: Vec<Transaction> = outcomes
        .iter()
        .map(|outcome| outcome.transaction.clone())
        .collect();

    match output_path {
        Some(path) => write_transactions_csv(BufWriter::new(File::create(path)?), &updated)?,
        None => write_transactions_csv(io::stdout().lock(), &updated)?,
    }

    if let Some(path) = executions_path {
        let records: Vec<_> = outcomes
            .iter()
            .flat_map(|outcome| outcome.executions.iter())
            .collect();
        fs::write(path, serde_json::to_string_pretty(&records)?)?;
    }

    Ok(())
}

fn validate(rules_path: &Path) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(rules_path)?;

    let rules = match import_rules(&text) {
        Ok(rules) => rules,
        Err(error) => {
            eprintln!("{rules_path:?} cannot be imported: {error}");
            exit(1);
        }
    };

    let mut has_problems = false;

    for rule in &rules {
        if let Err(problems) = validate_rule(rule) {
            has_problems = true;
            eprintln!("Rule \"{}\":", rule.name);
            for problem in problems {
                eprintln!("  {problem}");
            }
        }
    }

    if has_problems {
        exit(1);
    }

    println!("{} rules can be imported", rules.len());

    Ok(())
}

fn dry_run(rules_path: &Path, transaction: &Transaction) -> Result<(), Box<dyn Error>> {
    let rules = load_rules(rules_path)?;

    for rule in &rules {
        let test = test_rule(rule, transaction);

        if test.matches {
            println!(
                "{}: matched, category={:?} flag={:?} memo={:?}",
                rule.name, test.result.category, test.result.flag, test.result.memo
            );
        } else {
            println!("{}: no match", rule.name);
        }
    }

    Ok(())
}
