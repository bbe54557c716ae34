//! EADST - outbreak investigation toolkit
//!
//! CLI entry point for project setup, data import, tracing and analysis.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, info, warn};

use eadst::analysis::{self, EpiCurve, TimeUnit};
use eadst::cli::{CatalogCommand, Cli, Command, OutputFormat, ParamsCommand, SchemeCommand};
use eadst::config::Config;
use eadst::import::{CommitOptions, ImportError, ImportSession, Loader, RequiredField};
use eadst::project::{LAYERS_DIR, Project, ProjectError};
use eadst::records::{OutbreakRecord, add_record};
use eadst::refdb::ReferenceDb;
use eadst::surveillance::{CostQuantities, EconomicParameters, SurveillanceScheme, estimate_cost, scheme_path};
use eadst::trace_links::{FieldTracer, TraceDirection, TracePick, create_link};
use layerstore::{Coord, DirStore, parse_timestamp};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eadst")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("eadst.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Layer directory and CRS that commands write with
struct Workspace {
    layers_dir: PathBuf,
    crs: String,
}

impl Workspace {
    /// A project directory supplies its own CRS; any other directory is used
    /// as-is with the configured CRS.
    fn resolve(cli_project: Option<&Path>, config: &Config) -> Result<Self> {
        let root = cli_project.unwrap_or(config.project.path.as_path());
        match Project::open(root) {
            Ok(project) => {
                debug!(root = %root.display(), crs = %project.crs(), "Workspace::resolve: opened project");
                Ok(Self {
                    layers_dir: project.layers_dir(),
                    crs: project.crs().to_string(),
                })
            }
            Err(ProjectError::NotAProject(_)) => {
                debug!(root = %root.display(), "Workspace::resolve: not a project, using plain directory");
                Ok(Self {
                    layers_dir: root.join(LAYERS_DIR),
                    crs: config.project.crs.clone(),
                })
            }
            Err(e) => Err(e).context(format!("Failed to open project at {}", root.display())),
        }
    }

    fn store(&self) -> Result<DirStore> {
        DirStore::open(&self.layers_dir).context(format!("Failed to open layers at {}", self.layers_dir.display()))
    }
}

fn open_refdb(config: &Config) -> Result<ReferenceDb> {
    let path = &config.reference.db_path;
    ReferenceDb::open(path).context(format!("Failed to open reference database {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Dispatch command
    debug!(command = ?cli.command, "main: dispatching command");
    let project = cli.project.as_deref();
    match cli.command {
        Command::Init { name, parent, crs } => cmd_init(&config, &name, &parent, crs.as_deref()),
        Command::Import {
            file,
            mappings,
            layer,
            delimiter,
            dry_run,
            report,
        } => {
            let options = ImportArgs {
                mappings,
                layer,
                delimiter,
                dry_run,
                report,
            };
            cmd_import(&config, project, &file, options)
        }
        Command::Record {
            at,
            species,
            breed,
            cases,
            pop_at_risk,
            date,
            notes,
        } => {
            let event_date = date
                .as_deref()
                .map(|s| {
                    parse_timestamp(s)
                        .map(|ts| ts.and_utc())
                        .ok_or_else(|| eyre!("Invalid date: {}", s))
                })
                .transpose()?;
            let record = OutbreakRecord {
                species,
                breed,
                event_date,
                cases,
                pop_at_risk,
                notes,
            };
            cmd_record(&config, project, at, &record)
        }
        Command::Trace {
            index,
            linked,
            direction,
            radius,
        } => cmd_trace(&config, project, index, linked, direction, radius),
        Command::Epicurve {
            layer,
            field,
            unit,
            format,
        } => cmd_epicurve(&config, project, &layer, &field, unit, format),
        Command::AttackRate {
            layer,
            cases,
            population,
            stratify,
            format,
        } => cmd_attack_rate(&config, project, &layer, &cases, &population, stratify.as_deref(), format),
        Command::Scheme { command } => match command {
            SchemeCommand::Create {
                output,
                objective,
                context,
                inference_group,
                unit_selection,
                measurements,
                tools,
                number_units,
                frequency,
                data_recording,
            } => {
                let scheme = SurveillanceScheme {
                    objective: objective.unwrap_or_default(),
                    context: context.unwrap_or_default(),
                    inference_group: inference_group.unwrap_or_default(),
                    unit_selection: unit_selection.unwrap_or_default(),
                    measurements: measurements.unwrap_or_default(),
                    tools: tools.unwrap_or_default(),
                    number_units: number_units.unwrap_or_default(),
                    frequency: frequency.unwrap_or_default(),
                    data_recording: data_recording.unwrap_or_default(),
                };
                cmd_scheme_create(&scheme, &output)
            }
            SchemeCommand::Cost {
                file,
                staff_days,
                distance_km,
                lab_tests,
            } => {
                let quantities = CostQuantities {
                    staff_days,
                    distance_km,
                    lab_tests,
                };
                cmd_scheme_cost(&config, &file, &quantities)
            }
        },
        Command::Catalog { command } => match command {
            CatalogCommand::Add { species, breeds } => cmd_catalog_add(&config, &species, &breeds),
            CatalogCommand::List { species } => cmd_catalog_list(&config, species.as_deref()),
        },
        Command::Params { command } => match command {
            ParamsCommand::Show => cmd_params_show(&config),
            ParamsCommand::Set { key, value } => cmd_params_set(&config, &key, value),
            ParamsCommand::Reset => cmd_params_reset(&config),
        },
    }
}

fn cmd_init(config: &Config, name: &str, parent: &Path, crs: Option<&str>) -> Result<()> {
    debug!(%name, parent = %parent.display(), ?crs, "cmd_init: called");
    let crs = crs.unwrap_or(config.project.crs.as_str());
    let project = Project::create(parent, name, crs).context("Failed to create project")?;
    println!(
        "{} Created project {} at {} ({})",
        "✓".green(),
        project.info().name.cyan(),
        project.root().display(),
        project.crs().dimmed()
    );
    for dir in [project.data_dir(), project.layers_dir(), project.outputs_dir()] {
        println!("  {}", dir.display());
    }
    Ok(())
}

struct ImportArgs {
    mappings: Vec<(RequiredField, String)>,
    layer: Option<String>,
    delimiter: Option<char>,
    dry_run: bool,
    report: Option<PathBuf>,
}

/// Load, map, validate and (unless dry-run) commit one source file
fn cmd_import(config: &Config, project: Option<&Path>, file: &Path, args: ImportArgs) -> Result<()> {
    debug!(file = %file.display(), dry_run = args.dry_run, "cmd_import: called");
    let mut import_config = config.import.clone();
    if let Some(delimiter) = args.delimiter {
        import_config.delimiter = delimiter;
    }
    let loader = Loader::new().with_delimiter(import_config.delimiter_byte()?);
    let mut session = ImportSession::new(loader);

    let table = session.load(file)?;
    println!(
        "Loaded {} rows, {} columns from {}",
        table.len(),
        table.columns().len(),
        file.display()
    );

    let mapping = session.auto_map()?;
    for (field, column) in mapping.entries() {
        println!("  {} ← {}", field.name().yellow(), column);
    }
    for (field, column) in args.mappings {
        println!("  {} ← {} (override)", field.name().yellow(), column);
        session.set_field(field, Some(&column))?;
    }

    let catalog = open_refdb(config)?.load_catalog().context("Failed to read reference catalog")?;
    match session.validate(&catalog).map(|_| ()) {
        Ok(()) => {}
        Err(ImportError::Mapping(e)) => {
            let columns = session.table().map(|t| t.columns().join(", ")).unwrap_or_default();
            return Err(eyre!("{}\nAvailable columns: {}\nUse --map FIELD=COLUMN", e, columns));
        }
        Err(e) => return Err(e.into()),
    }
    let (Some(table), Some(report)) = (session.table(), session.report()) else {
        return Err(eyre!("Validation produced no report"));
    };

    println!(
        "Validated {} rows: {} valid, {} invalid",
        report.total(),
        report.valid_count().to_string().green(),
        report.invalid_count().to_string().red()
    );
    for (index, failure) in report.failures().take(20) {
        // +2: header line and 1-based numbering
        println!("  {} line {}: {}", "✗".red(), index + 2, failure);
    }
    if report.invalid_count() > 20 {
        println!("  ... and {} more", report.invalid_count() - 20);
    }

    if let Some(path) = &args.report {
        let out = fs::File::create(path).context(format!("Failed to create {}", path.display()))?;
        report
            .write_annotated(table, out)
            .context(format!("Failed to write {}", path.display()))?;
        println!("Wrote validation report to {}", path.display());
    }

    if args.dry_run {
        info!(file = %file.display(), "Dry run, nothing committed");
        println!("{} Dry run, nothing committed", "i".blue());
        return Ok(());
    }

    let workspace = Workspace::resolve(project, config)?;
    let mut store = workspace.store()?;
    let options = CommitOptions {
        layer_name: args.layer.unwrap_or(import_config.layer_name),
        crs: workspace.crs,
    };
    let summary = session.commit(&mut store, &options)?;
    if !summary.dropped_columns.is_empty() {
        warn!(layer = %summary.layer, dropped = ?summary.dropped_columns, "Columns not in layer schema");
        println!(
            "{} Layer {} has no field for: {}",
            "!".yellow(),
            summary.layer,
            summary.dropped_columns.join(", ")
        );
    }
    println!(
        "{} Committed {} features to {}{}",
        "✓".green(),
        summary.committed,
        summary.layer.cyan(),
        if summary.created_layer { " (new layer)" } else { "" }
    );
    Ok(())
}

fn cmd_record(config: &Config, project: Option<&Path>, at: Coord, record: &OutbreakRecord) -> Result<()> {
    debug!(x = at.x, y = at.y, "cmd_record: called");
    let workspace = Workspace::resolve(project, config)?;
    let mut store = workspace.store()?;
    let catalog = open_refdb(config)?.load_catalog().context("Failed to read reference catalog")?;
    let added = add_record(&mut store, &catalog, at, record, &workspace.crs)?;
    println!("{} Added outbreak {} (feature {})", "✓".green(), added.event_id, added.id);
    Ok(())
}

fn cmd_trace(
    config: &Config,
    project: Option<&Path>,
    index: Coord,
    linked: Coord,
    direction: TraceDirection,
    radius: Option<f64>,
) -> Result<()> {
    debug!(?index, ?linked, %direction, ?radius, "cmd_trace: called");
    let workspace = Workspace::resolve(project, config)?;
    let mut store = workspace.store()?;
    let mut tracer = FieldTracer::new(radius.unwrap_or(config.tracing.search_radius));

    tracer.pick(&store, index).context("Failed to select index case")?;
    let (index, linked) = match tracer.pick(&store, linked).context("Failed to select linked premise")? {
        TracePick::Pair { index, linked } => (index, linked),
        TracePick::IndexCase(_) => return Err(eyre!("Tracer lost the index case selection")),
    };

    let id = create_link(&mut store, &index, &linked, direction, &workspace.crs)?;
    println!(
        "{} {} link {} between features {} and {}",
        "✓".green(),
        direction.label().cyan(),
        id,
        index.id,
        linked.id
    );
    Ok(())
}

fn print_epicurve(curve: &EpiCurve) {
    let peak = curve.peak().map(|b| b.count).unwrap_or(0).max(1);
    for bin in &curve.bins {
        let label = match curve.unit {
            TimeUnit::Day => bin.start.to_string(),
            _ => format!("{} - {}", bin.start, bin.end),
        };
        let bar = "█".repeat(bin.count * 40 / peak);
        println!("{:<23} {:>5} {}", label, bin.count, bar.red());
    }
    println!("Total: {}", curve.total());
    if curve.skipped > 0 {
        println!("{} {} features had no usable date", "!".yellow(), curve.skipped);
    }
}

fn cmd_epicurve(
    config: &Config,
    project: Option<&Path>,
    layer: &str,
    field: &str,
    unit: TimeUnit,
    format: OutputFormat,
) -> Result<()> {
    debug!(%layer, %field, %unit, ?format, "cmd_epicurve: called");
    let store = Workspace::resolve(project, config)?.store()?;
    let curve = analysis::epicurve(&store, layer, field, unit)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&curve)?),
        OutputFormat::Text => print_epicurve(&curve),
    }
    Ok(())
}

fn cmd_attack_rate(
    config: &Config,
    project: Option<&Path>,
    layer: &str,
    cases: &str,
    population: &str,
    stratify: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    debug!(%layer, %cases, %population, ?stratify, ?format, "cmd_attack_rate: called");
    let store = Workspace::resolve(project, config)?.store()?;
    let rows = analysis::attack_rates(&store, layer, cases, population, stratify)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            println!(
                "{:<20} {:>10} {:>12} {:>10}",
                stratify.unwrap_or("Group"),
                "Cases",
                "Population",
                "AR (%)"
            );
            for row in rows {
                let rate = row.rate.map(|r| format!("{:.2}", r)).unwrap_or_else(|| "n/a".to_string());
                println!("{:<20} {:>10} {:>12} {:>10}", row.group, row.cases, row.population, rate);
            }
        }
    }
    Ok(())
}

fn cmd_scheme_create(scheme: &SurveillanceScheme, output: &Path) -> Result<()> {
    debug!(output = %output.display(), "cmd_scheme_create: called");
    let missing = scheme.missing_elements();
    if !missing.is_empty() {
        let prompts: Vec<String> = SurveillanceScheme::ELEMENTS
            .iter()
            .filter(|(key, _)| missing.contains(key))
            .map(|(key, prompt)| format!("  --{}  ({})", key.replace('_', "-"), prompt))
            .collect();
        return Err(eyre!("Please complete all fields. Missing:\n{}", prompts.join("\n")));
    }
    let path = scheme_path(output);
    scheme.save(&path)?;
    println!("{} Saved surveillance scheme to {}", "✓".green(), path.display());
    Ok(())
}

fn cmd_scheme_cost(config: &Config, file: &Path, quantities: &CostQuantities) -> Result<()> {
    debug!(file = %file.display(), ?quantities, "cmd_scheme_cost: called");
    let scheme = SurveillanceScheme::load(file)?;
    let params = EconomicParameters::from_map(
        &open_refdb(config)?
            .economic_parameters()
            .context("Failed to read economic parameters")?,
    );
    let estimate = estimate_cost(quantities, &params);

    println!("Objective: {}", scheme.objective);
    println!(
        "  Personnel:  {:>10.2}  ({} days x {:.2})",
        estimate.personnel, quantities.staff_days, params.staff_daily_rate
    );
    println!(
        "  Logistics:  {:>10.2}  ({} km x {:.2})",
        estimate.logistics, quantities.distance_km, params.cost_per_km
    );
    println!(
        "  Laboratory: {:>10.2}  ({} tests x {:.2})",
        estimate.laboratory, quantities.lab_tests, params.cost_elisa_test
    );
    println!("  {}      {:>10.2}", "Total:".bold(), estimate.total);
    Ok(())
}

fn cmd_catalog_add(config: &Config, species: &str, breeds: &[String]) -> Result<()> {
    debug!(%species, ?breeds, "cmd_catalog_add: called");
    let db = open_refdb(config)?;
    db.add_species(species)?;
    for breed in breeds {
        db.add_breed(species, breed)?;
    }
    println!("{} {} ({} breeds added)", "✓".green(), species.cyan(), breeds.len());
    Ok(())
}

fn cmd_catalog_list(config: &Config, species: Option<&str>) -> Result<()> {
    debug!(?species, "cmd_catalog_list: called");
    let db = open_refdb(config)?;
    match species {
        Some(species) => {
            let breeds = db
                .breeds_for(species)?
                .ok_or_else(|| eyre!("Unknown species: {}", species))?;
            if breeds.is_empty() {
                println!("No breeds recorded for {}", species);
            }
            for breed in breeds {
                println!("{}", breed);
            }
        }
        None => {
            let all = db.list_species()?;
            if all.is_empty() {
                println!("No species in {}", config.reference.db_path.display());
            }
            for name in all {
                println!("{}", name.cyan());
            }
        }
    }
    Ok(())
}

fn cmd_params_show(config: &Config) -> Result<()> {
    debug!("cmd_params_show: called");
    let stored = open_refdb(config)?.economic_parameters()?;
    let mut params = EconomicParameters::from_map(&stored).to_map();
    params.extend(stored.clone());
    for (key, value) in params {
        let source = if stored.contains_key(&key) { "" } else { " (default)" };
        println!("{:<20} {:>10.2}{}", key.yellow(), value, source.dimmed());
    }
    Ok(())
}

fn cmd_params_set(config: &Config, key: &str, value: f64) -> Result<()> {
    debug!(%key, value, "cmd_params_set: called");
    if !value.is_finite() {
        return Err(eyre!("Parameter value must be a finite number"));
    }
    open_refdb(config)?.set_parameter(key, value)?;
    println!("{} {} = {}", "✓".green(), key.yellow(), value);
    Ok(())
}

fn cmd_params_reset(config: &Config) -> Result<()> {
    debug!("cmd_params_reset: called");
    let defaults = EconomicParameters::default().to_map();
    open_refdb(config)?.save_economic_parameters(&defaults)?;
    for (key, value) in &defaults {
        println!("{:<20} {:>10.2}", key.yellow(), value);
    }
    println!("{} Restored default costing parameters", "✓".green());
    Ok(())
}
