//! Unit tests for CLI argument parsing

use clap::Parser;
use erate_open_data::cli::{Cli, Commands, OutputFormat};

#[test]
fn test_global_defaults() {
    let cli = Cli::parse_from(["erate-open-data", "fetch"]);

    assert_eq!(cli.base_url, "https://opendata.usac.org");
    assert_eq!(cli.batch_size, 5000);
    assert_eq!(cli.max_records, 0);
    assert_eq!(cli.max_retries, 3);
    assert!(matches!(cli.output_format, OutputFormat::Human));
    assert!(!cli.quiet);

    match cli.command {
        Commands::Fetch(args) => {
            assert_eq!(args.dataset, "form-471");
            assert!(args.output.is_none());
            assert!(args.columns.is_none());
            assert!(args.filter.to_filter().is_empty());
        }
        _ => panic!("expected fetch command"),
    }
}

#[test]
fn test_global_flags_apply_before_or_after_subcommand() {
    let cli = Cli::parse_from(["erate-open-data", "--max-retries", "10", "fetch"]);
    assert_eq!(cli.max_retries, 10);

    let cli = Cli::parse_from(["erate-open-data", "fetch", "--max-retries", "10"]);
    assert_eq!(cli.max_retries, 10);
}

#[test]
fn test_batch_size_bounds_rejected() {
    assert!(Cli::try_parse_from(["erate-open-data", "--batch-size", "0", "fetch"]).is_err());
    assert!(Cli::try_parse_from(["erate-open-data", "--batch-size", "60000", "fetch"]).is_err());
    assert!(Cli::try_parse_from(["erate-open-data", "--batch-size", "many", "fetch"]).is_err());

    let cli = Cli::parse_from(["erate-open-data", "--batch-size", "50000", "fetch"]);
    assert_eq!(cli.batch_size, 50000);
}

#[test]
fn test_max_retries_range() {
    assert!(Cli::try_parse_from(["erate-open-data", "--max-retries", "0", "fetch"]).is_err());
    assert!(Cli::try_parse_from(["erate-open-data", "--max-retries", "21", "fetch"]).is_err());

    let cli = Cli::parse_from(["erate-open-data", "--max-retries", "20", "fetch"]);
    assert_eq!(cli.max_retries, 20);
}

#[test]
fn test_output_format_parsing() {
    let cli = Cli::parse_from(["erate-open-data", "--output-format", "json", "fetch"]);
    assert!(matches!(cli.output_format, OutputFormat::Json));

    let cli = Cli::parse_from(["erate-open-data", "--output-format", "HUMAN", "fetch"]);
    assert!(matches!(cli.output_format, OutputFormat::Human));

    assert!(Cli::try_parse_from(["erate-open-data", "--output-format", "yaml", "fetch"]).is_err());
}

#[test]
fn test_filter_flags_compile_into_where_clause() {
    let cli = Cli::parse_from([
        "erate-open-data",
        "fetch",
        "--year",
        "2024",
        "--state",
        "NY",
        "--status",
        "Denied",
        "--status",
        "Cancelled",
        "--organization",
        "albany",
    ]);

    let filter = match cli.command {
        Commands::Fetch(args) => args.filter.to_filter(),
        _ => panic!("expected fetch command"),
    };
    let clause = filter.to_where_clause().unwrap();
    assert!(clause.contains("funding_year = '2024'"));
    assert!(clause.contains("state = 'NY'"));
    assert!(clause.contains(
        "(form_471_frn_status_name = 'Denied' OR form_471_frn_status_name = 'Cancelled')"
    ));
    assert!(clause.contains("upper(organization_name) like '%ALBANY%'"));
}

#[test]
fn test_raw_where_flag() {
    let cli = Cli::parse_from([
        "erate-open-data",
        "stats",
        "--where",
        "dis_pct > '80'",
    ]);

    let filter = match cli.command {
        Commands::Stats(args) => args.filter.to_filter(),
        _ => panic!("expected stats command"),
    };
    assert_eq!(filter.to_where_clause().unwrap(), "(dis_pct > '80')");
}

#[test]
fn test_balance_args() {
    let cli = Cli::parse_from(["erate-open-data", "balance", "--ben", "143022", "--year", "2023"]);

    match cli.command {
        Commands::Balance(args) => {
            assert_eq!(args.ben, "143022");
            assert_eq!(args.year, Some(2023));
        }
        _ => panic!("expected balance command"),
    }
}

#[test]
fn test_enrich_defaults_and_repeated_bens() {
    let cli = Cli::parse_from([
        "erate-open-data",
        "enrich",
        "--ben",
        "100001",
        "--ben",
        "100002",
    ]);

    match cli.command {
        Commands::Enrich(args) => {
            assert_eq!(args.bens, vec!["100001", "100002"]);
            assert!(args.bens_file.is_none());
            assert_eq!(args.dataset, "form-471");
            assert_eq!(args.ledger.to_str().unwrap(), "enrichment_progress.json");
            assert_eq!(args.output.to_str().unwrap(), "enrichment.csv");
            assert_eq!(args.checkpoint_interval, 10);
            assert!(args.item_delay_ms.is_none());
        }
        _ => panic!("expected enrich command"),
    }
}
