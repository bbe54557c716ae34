//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use layerstore::Coord;
use std::path::PathBuf;

use crate::analysis::TimeUnit;
use crate::import::RequiredField;
use crate::trace_links::TraceDirection;

/// EADST - outbreak investigation field toolkit
#[derive(Parser, Debug)]
#[command(name = "eadst", version, about = "Outbreak investigation toolkit for field epidemiologists")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Project directory (overrides config)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new investigation project
    Init {
        /// Project name (becomes the directory name)
        name: String,

        /// Parent directory
        #[arg(long, default_value = ".")]
        parent: PathBuf,

        /// Project CRS
        #[arg(long)]
        crs: Option<String>,
    },

    /// Import outbreak rows from a delimited file
    Import {
        /// Source file
        file: PathBuf,

        /// Override a mapping entry (FIELD=COLUMN, e.g. latitude=lat); repeatable
        #[arg(short, long = "map", value_name = "FIELD=COLUMN", value_parser = parse_mapping)]
        mappings: Vec<(RequiredField, String)>,

        /// Destination layer (overrides config)
        #[arg(long)]
        layer: Option<String>,

        /// Field delimiter (overrides config)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Validate only, do not write
        #[arg(long)]
        dry_run: bool,

        /// Write the source rows with a validation_error column to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Add one outbreak record at a point
    Record {
        /// Location as X,Y (longitude,latitude)
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        at: Coord,

        #[arg(long)]
        species: Option<String>,

        #[arg(long)]
        breed: Option<String>,

        /// Number of cases
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        cases: i64,

        /// Population at risk
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        pop_at_risk: i64,

        /// Event date (RFC 3339 or YYYY-MM-DD); now when omitted
        #[arg(long)]
        date: Option<String>,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Link an index case to a linked premise
    Trace {
        /// Point near the index case, X,Y
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        index: Coord,

        /// Point near the linked premise, X,Y
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        linked: Coord,

        /// back (linked premise is the source) or forward
        #[arg(short, long)]
        direction: TraceDirection,

        /// Search radius (overrides config)
        #[arg(short, long)]
        radius: Option<f64>,
    },

    /// Outbreak counts per day, week or month
    Epicurve {
        #[arg(long, default_value = "Outbreak_Points")]
        layer: String,

        /// Date field
        #[arg(long, default_value = "Event_Date")]
        field: String,

        /// Bin width: day, week or month
        #[arg(short, long, default_value = "day")]
        unit: TimeUnit,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Attack rates, overall or per group
    AttackRate {
        #[arg(long, default_value = "Outbreak_Points")]
        layer: String,

        /// Cases field
        #[arg(long, default_value = "Cases")]
        cases: String,

        /// Population-at-risk field
        #[arg(long, default_value = "Pop_At_Risk")]
        population: String,

        /// Stratify by this field
        #[arg(short, long)]
        stratify: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Surveillance scheme design and costing
    Scheme {
        #[command(subcommand)]
        command: SchemeCommand,
    },

    /// Species/breed reference catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },

    /// Economic parameters
    Params {
        #[command(subcommand)]
        command: ParamsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum SchemeCommand {
    /// Write a scheme file; every element is required
    Create {
        /// Output file (.eadss.json appended if missing)
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        objective: Option<String>,
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        inference_group: Option<String>,
        #[arg(long)]
        unit_selection: Option<String>,
        #[arg(long)]
        measurements: Option<String>,
        #[arg(long)]
        tools: Option<String>,
        #[arg(long)]
        number_units: Option<String>,
        #[arg(long)]
        frequency: Option<String>,
        #[arg(long)]
        data_recording: Option<String>,
    },

    /// Estimate the cost of a scheme
    Cost {
        /// Scheme file
        file: PathBuf,

        #[arg(long, default_value = "10")]
        staff_days: f64,

        #[arg(long, default_value = "500")]
        distance_km: f64,

        #[arg(long, default_value = "200")]
        lab_tests: f64,
    },
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// Add a species and optionally breeds of it
    Add {
        species: String,
        breeds: Vec<String>,
    },

    /// List species, or the breeds of one species
    List { species: Option<String> },
}

#[derive(Debug, Subcommand)]
pub enum ParamsCommand {
    /// Show parameters (stored values over defaults)
    Show,

    /// Set one parameter
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },

    /// Write the default costing parameters back to the database
    Reset,
}

/// Output format for analysis commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Parse `X,Y` into a coordinate
pub fn parse_point(s: &str) -> Result<Coord, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {:?}", s))?;
    let num = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("not a number: {:?}", v))
    };
    Ok(Coord::new(num(x)?, num(y)?))
}

/// Parse `FIELD=COLUMN`
pub fn parse_mapping(s: &str) -> Result<(RequiredField, String), String> {
    let (field, column) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=COLUMN, got {:?}", s))?;
    let field = field.parse::<RequiredField>()?;
    Ok((field, column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("38.74, 9.03").unwrap(), Coord::new(38.74, 9.03));
        assert_eq!(parse_point("-1.5,2").unwrap(), Coord::new(-1.5, 2.0));
        assert!(parse_point("38.74").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn test_parse_mapping() {
        assert_eq!(
            parse_mapping("latitude=Lat (dd)").unwrap(),
            (RequiredField::Latitude, "Lat (dd)".to_string())
        );
        assert!(parse_mapping("height=h").is_err());
        assert!(parse_mapping("latitude").is_err());
    }

    #[test]
    fn test_import_args() {
        let cli = Cli::try_parse_from([
            "eadst",
            "--project",
            "proj",
            "import",
            "data.csv",
            "--map",
            "latitude=y",
            "-m",
            "longitude=x",
            "--dry-run",
        ])
        .unwrap();
        let Command::Import { mappings, dry_run, .. } = cli.command else {
            panic!("expected import");
        };
        assert!(dry_run);
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[1], (RequiredField::Longitude, "x".to_string()));
        assert_eq!(cli.project, Some(PathBuf::from("proj")));
    }

    #[test]
    fn test_params_set_accepts_negative_value() {
        let cli = Cli::try_parse_from(["eadst", "params", "set", "cost_per_km", "-1.5"]).unwrap();
        let Command::Params {
            command: ParamsCommand::Set { key, value },
        } = cli.command
        else {
            panic!("expected params set");
        };
        assert_eq!(key, "cost_per_km");
        assert_eq!(value, -1.5);
    }

    #[test]
    fn test_trace_args() {
        let cli = Cli::try_parse_from([
            "eadst", "trace", "--index", "-1,2", "--linked", "3,4", "--direction", "back",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Trace {
                direction: TraceDirection::Back,
                ..
            }
        ));
    }
}
