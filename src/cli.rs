use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use colored::*;
use wellbeing_planner::config::AppConfig;
use wellbeing_planner::history::{SeriesSelection, Verdict, classify};
use wellbeing_planner::models::{Category, CategoryRatings, Rating};
use wellbeing_planner::session::Session;
use wellbeing_planner::weights::PairwiseMatrix;

#[derive(Parser, Debug)]
#[command(name = "wellbeing-planner")]
#[command(about = "Daily well-being log with weighted categories")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rate a day; categories left out stay unrated
    Rate(RateArgs),
    /// List entries, most recent first
    History,
    Delete {
        date: String,
    },
    Weights(WeightsCmd),
    /// Average rating per category
    Averages,
    /// Predict the next day from the trend so far
    Forecast,
    /// Chart points for `overall` or one category, oldest first
    Series {
        selection: SeriesSelection,
    },
    /// Show the stored theme, or store a new one
    Theme {
        name: Option<String>,
    },
    Settings(SettingsCmd),
}

#[derive(Args, Debug)]
pub struct RateArgs {
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub wellbeing: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub home: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub work: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub street: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub weather: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub inanimate: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub living: Option<String>,
}

impl RateArgs {
    fn raw(&self, category: Category) -> Option<&str> {
        let value = match category {
            Category::Wellbeing => &self.wellbeing,
            Category::Home => &self.home,
            Category::Work => &self.work,
            Category::Street => &self.street,
            Category::Weather => &self.weather,
            Category::Inanimate => &self.inanimate,
            Category::Living => &self.living,
        };
        value.as_deref()
    }

    fn ratings(&self) -> CategoryRatings {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.raw(c).map(Rating::parse).unwrap_or(Rating::Unrated)))
            .collect()
    }
}

#[derive(Parser, Debug)]
pub struct WeightsCmd {
    #[command(subcommand)]
    pub cmd: WeightsSub,
}

#[derive(Subcommand, Debug)]
pub enum WeightsSub {
    Show,
    /// Derive weights from the 21 upper-triangle comparisons, row by row:
    /// wellbeing vs home, wellbeing vs work, …, inanimate vs living
    Set {
        #[arg(allow_hyphen_values = true)]
        cells: Vec<String>,
    },
}

#[derive(Parser, Debug)]
pub struct SettingsCmd {
    #[command(subcommand)]
    pub cmd: SettingsSub,
}

#[derive(Subcommand, Debug)]
pub enum SettingsSub {
    Show,
}

pub fn run(cli: Cli, cfg: AppConfig) -> Result<()> {
    let mut session = Session::open(cfg)?;
    match cli.command {
        Commands::Rate(args) => handle_rate(&mut session, args),
        Commands::History => handle_history(&session),
        Commands::Delete { date } => {
            let date = parse_date(&date, &session.config().settings.ui.date_format)?;
            if session.delete(date)? {
                println!("Entry for {date} deleted.");
            } else {
                println!("No entry for {date}.");
            }
            Ok(())
        }
        Commands::Weights(weights_cmd) => handle_weights(&mut session, weights_cmd),
        Commands::Averages => {
            for (category, avg) in session.averages() {
                println!("{:<20} {avg:.1}", category.label());
            }
            Ok(())
        }
        Commands::Forecast => handle_forecast(&session),
        Commands::Series { selection } => {
            let fmt = session.config().settings.ui.date_format.clone();
            for point in session.series(selection) {
                let value = point
                    .value
                    .map(|v| format!("{v:.1}"))
                    .unwrap_or_else(|| "-".into());
                println!("{} | {value}", point.date.format(&fmt));
            }
            Ok(())
        }
        Commands::Theme { name } => {
            if let Some(name) = name {
                session.set_theme(&name)?;
            }
            println!("Theme: {}", session.theme()?);
            Ok(())
        }
        Commands::Settings(settings_cmd) => handle_settings(&session, settings_cmd),
    }
}

fn handle_rate(session: &mut Session, args: RateArgs) -> Result<()> {
    let date = match args.date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            Some(parse_date(raw, &session.config().settings.ui.date_format)?)
        }
        _ => None,
    };
    let entry = session.record(date, args.ratings())?;
    println!(
        "Saved {}: overall {}",
        entry.date,
        paint(entry.overall, classify(entry.overall))
    );
    Ok(())
}

fn handle_history(session: &Session) -> Result<()> {
    let history = session.history();
    if history.is_empty() {
        println!("No ratings yet.");
    }
    let fmt = &session.config().settings.ui.date_format;
    for entry in history.ordered_descending() {
        let rated = entry
            .ratings
            .rated()
            .map(|(c, v)| format!("{c}:{v}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{} | overall:{} | {}",
            entry.date.format(fmt),
            paint(entry.overall, classify(entry.overall)),
            rated
        );
    }
    Ok(())
}

fn handle_weights(session: &mut Session, cmd: WeightsCmd) -> Result<()> {
    if let WeightsSub::Set { cells } = cmd.cmd {
        let expected = PairwiseMatrix::upper_triangle_len(Category::COUNT);
        if cells.len() != expected {
            println!(
                "{}",
                format!("Got {} comparisons, expected {expected}; the rest count as 1.", cells.len())
                    .yellow()
            );
        }
        let matrix = PairwiseMatrix::from_upper_triangle(Category::COUNT, &cells);
        session.save_weights(&matrix)?;
        println!("Weights saved.");
    }
    let weights = session.weights();
    for category in Category::ALL {
        println!("{:<20} {:.3}", category.label(), weights.weight(category));
    }
    println!("{:<20} {:.3}", "(sum)", weights.sum());
    Ok(())
}

fn handle_forecast(session: &Session) -> Result<()> {
    let forecast = session.forecast()?;
    println!(
        "Forecast overall: {}",
        paint(forecast.overall, classify(forecast.overall))
    );
    for (category, value) in &forecast.categories {
        println!("{:<20} {value:.1}", category.label());
    }
    Ok(())
}

fn handle_settings(session: &Session, cmd: SettingsCmd) -> Result<()> {
    let cfg = session.config();
    match cmd.cmd {
        SettingsSub::Show => {
            println!("Config directory: {}", cfg.base_dir.display());
            println!("Store: {}", cfg.settings.paths.store_json.display());
            println!("Backup dir: {}", cfg.settings.paths.backup_dir.display());
            println!("Normalize weights: {}", cfg.settings.weights.normalize);
            println!("Forecast minimum: {}", cfg.settings.forecast.min_entries);
            println!("Default theme: {}", cfg.settings.ui.default_theme);
        }
    }
    Ok(())
}

fn paint(overall: f64, verdict: Verdict) -> ColoredString {
    let text = format!("{overall:.1} ({verdict})");
    match verdict {
        Verdict::Good => text.green(),
        Verdict::Ok => text.yellow(),
        Verdict::Bad => text.red(),
    }
}

fn parse_date(input: &str, fmt: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), fmt)
        .with_context(|| format!("Failed to parse date {input} with format {fmt}"))
}
