use std::ffi::OsString;
use std::fmt::Display;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::error::ErrorKind;
use clap::CommandFactory;
use clap::Parser;
use fieldx::fxstruct;
use garde::Validate;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use strum::IntoEnumIterator;
use tracing::debug;
use tracing::info;
use tracing::instrument;

use crate::aggregate::Aggregates;
use crate::frame::SalesFrame;
use crate::generator::DataGenerator;
use crate::render::ChartKind;
use crate::render::ChartRenderer;
use crate::reporter::Reporter;
use crate::reporter::SalesReporter;
use crate::types::Result;

/// Environment variable holding the tracing filter directives.
pub const LOG_ENV: &str = "SALES_REPORT_LOG";

#[derive(Debug, Clone, clap::Parser, Validate)]
#[fxstruct(no_new, get(copy))]
#[clap(about, version, author, name = "sales-report")]
pub struct Cli {
    /// Seed of the random generator.
    #[clap(long, env = "SALES_REPORT_SEED", default_value_t = 42)]
    #[garde(skip)]
    seed: u64,

    /// Number of customers to generate.
    #[clap(long, env = "SALES_REPORT_CUSTOMERS", default_value_t = 500)]
    #[garde(range(min = 1))]
    customers: u32,

    /// Number of products to generate.
    #[clap(long, env = "SALES_REPORT_PRODUCTS", default_value_t = 50)]
    #[garde(range(min = 1))]
    products: u32,

    /// Number of orders to generate.
    #[clap(long, env = "SALES_REPORT_ORDERS", default_value_t = 2_000)]
    #[garde(range(min = 1))]
    orders: u32,

    /// The year orders are placed in.
    #[clap(long, env = "SALES_REPORT_YEAR", default_value_t = 2023)]
    #[garde(range(min = 1970, max = 9999))]
    year: i32,

    /// Youngest customer age. Ages must stay within the 18-60 range covered by the age groups.
    #[clap(long, env = "SALES_REPORT_MIN_AGE", default_value_t = 18)]
    #[garde(range(min = 18, max = 60), custom(Self::not_above("max-age", &self.max_age)))]
    min_age: u32,

    /// Oldest customer age.
    #[clap(long, env = "SALES_REPORT_MAX_AGE", default_value_t = 59)]
    #[garde(range(min = 18, max = 60))]
    max_age: u32,

    /// Length of the top products and top customers rankings.
    #[clap(long, env = "SALES_REPORT_TOP", default_value_t = 10)]
    #[garde(range(min = 1))]
    top: usize,

    /// Directory to write the charts into.
    #[clap(long, short, env = "SALES_REPORT_OUTPUT_DIR", default_value = "charts")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    output_dir: PathBuf,

    /// Don't render the charts.
    #[clap(long, env = "SALES_REPORT_NO_CHARTS", default_value_t = false)]
    #[garde(skip)]
    no_charts: bool,

    /// Save all aggregates as JSON into this file.
    #[clap(long, env = "SALES_REPORT_JSON")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    json: Option<PathBuf>,

    /// Silence the output
    #[clap(long, short, env = "SALES_REPORT_QUIET", default_value_t = false)]
    #[garde(skip)]
    quiet: bool,

    /// File to send log into
    #[clap(long, env = "SALES_REPORT_LOG_FILE")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn not_above<'a, T: PartialOrd + Display>(
        max_name: &'static str,
        max: &'a T,
    ) -> impl FnOnce(&'a T, &()) -> garde::Result {
        move |value, _| {
            if value > max {
                Err(garde::Error::new(format!(
                    "{} is more than {max_name} ({})",
                    *value, *max
                )))
            }
            else {
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
pub struct SalesReportApp {
    cli: Cli,
}

impl SalesReportApp {
    pub fn from_env() -> Result<Self> {
        Ok(Self { cli: Cli::try_parse()? })
    }

    /// The first argument is the program name, as with `std::env::args`.
    pub fn with_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        Ok(Self {
            cli: Cli::try_parse_from(args)?,
        })
    }

    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    fn validate(&self) -> Result<()> {
        if let Err(err) = self.cli.validate() {
            let mut cmd = Cli::command();
            return Err(cmd.error(ErrorKind::InvalidValue, err).into());
        }

        Ok(())
    }

    fn setup_tracing(&self) -> Result<()> {
        use tracing_subscriber::fmt::format::FmtSpan;
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;
        use tracing_subscriber::EnvFilter;

        let log_file = self.cli.log_file();

        // A subscriber may already be installed when the app runs more than once in a process. The log file is left
        // alone then.
        if tracing::dispatcher::has_been_set() {
            if let Some(log_file) = &log_file {
                debug!("Tracing is already initialized, {} is not used", log_file.display());
            }
            return Ok(());
        }

        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

        let dest_writer = Mutex::new(if let Some(log_file) = &log_file {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(log_file)?;
            Box::new(file) as Box<dyn io::Write + Send>
        }
        else {
            Box::new(io::stderr()) as Box<dyn io::Write + Send>
        });

        let registry = tracing_subscriber::registry().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_writer(dest_writer)
                .with_ansi(log_file.is_none())
                .with_span_events(FmtSpan::CLOSE),
        );

        if registry.try_init().is_ok() {
            info!("Tracing initialized");
        }

        Ok(())
    }

    fn generator(&self) -> Result<DataGenerator> {
        let cli = &self.cli;
        Ok(DataGenerator::builder()
            .seed(cli.seed())
            .customer_count(cli.customers())
            .product_count(cli.products())
            .order_count(cli.orders())
            .year(cli.year())
            .min_age(cli.min_age())
            .max_age(cli.max_age())
            .build()?)
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar> {
        if self.cli.quiet() || !console::user_attended_stderr() {
            return Ok(ProgressBar::hidden());
        }

        Ok(ProgressBar::new(len).with_prefix("Charts").with_style(
            ProgressStyle::default_bar()
                .template("{prefix}: [{elapsed_precise:.cyan}] {bar:30.cyan.on_240} {pos:>2.cyan}/{len:>2.cyan} {msg:.cyan}")?
                .progress_chars("█▉▊▋▌▍▎▏ "),
        ))
    }

    #[instrument(level = "debug", skip(self, aggregates))]
    fn render_charts(&self, aggregates: &Aggregates) -> Result<Vec<PathBuf>> {
        let renderer = ChartRenderer::builder()
            .output_dir(self.cli.output_dir())
            .year(self.cli.year())
            .build()?;

        let kinds: Vec<ChartKind> = ChartKind::iter().collect();
        let progress = self.progress_bar(kinds.len() as u64)?;
        let mut paths = Vec::with_capacity(kinds.len());

        for kind in kinds {
            progress.set_message(kind.to_string());
            paths.push(renderer.render(kind, aggregates)?);
            progress.inc(1);
        }

        progress.finish_and_clear();
        info!("{} charts written to {}", paths.len(), self.cli.output_dir().display());
        Ok(paths)
    }

    fn export_json(&self, aggregates: &Aggregates, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, aggregates)?;
        out.flush()?;
        debug!("Aggregates saved to {}", path.display());
        Ok(())
    }

    /// Run the whole pipeline: generate, join, aggregate, report, render and export.
    pub fn execute(&self) -> Result<Aggregates> {
        self.validate()?;
        self.setup_tracing()?;

        let cli = &self.cli;
        let reporter = Reporter::new(cli.quiet());

        let dataset = self.generator()?.generate()?;
        let frame = SalesFrame::join(&dataset);
        let aggregates = Aggregates::compute(&frame, cli.top());

        reporter.report(&aggregates)?;

        if !cli.no_charts() {
            let paths = self.render_charts(&aggregates)?;
            reporter.out(&format!("\n{} charts saved to {}", paths.len(), cli.output_dir().display()))?;
        }

        if let Some(json) = cli.json() {
            self.export_json(&aggregates, &json)?;
            reporter.out(&format!("Aggregates saved to {}", json.display()))?;
        }

        Ok(aggregates)
    }

    pub fn run() -> Result<()> {
        let app = match Self::from_env() {
            Ok(app) => app,
            Err(crate::types::ReportError::Cli(err))
                if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
            {
                err.print()?;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        app.execute().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReportError;

    #[test]
    fn test_cli_parsing() {
        let args = vec!["cmd", "--quiet", "--no-charts", "--orders", "30", "--seed", "7", "-o", "out"];
        let cli = Cli::try_parse_from(args).expect("Failed to parse CLI arguments");
        assert_eq!(cli.orders(), 30);
        assert_eq!(cli.seed(), 7);
        assert_eq!(cli.customers(), 500);
        assert_eq!(cli.top(), 10);
        assert_eq!(cli.output_dir(), PathBuf::from("out"));
        assert!(cli.quiet());
        assert!(cli.no_charts());
        assert!(cli.json().is_none());
    }

    #[test]
    fn test_validation() {
        let app = SalesReportApp::with_args(["cmd", "--quiet", "--no-charts", "--min-age", "50", "--max-age", "40"])
            .unwrap();
        assert!(matches!(app.execute(), Err(ReportError::Cli(_))));

        let app = SalesReportApp::with_args(["cmd", "--quiet", "--no-charts", "--max-age", "70"]).unwrap();
        assert!(matches!(app.execute(), Err(ReportError::Cli(_))));

        let app = SalesReportApp::with_args(["cmd", "--quiet", "--no-charts", "--top", "0"]).unwrap();
        assert!(matches!(app.execute(), Err(ReportError::Cli(_))));
    }

    #[test]
    fn test_log_file_kept_when_tracing_is_set() {
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());

        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("report.log");
        std::fs::write(&log_file, "previous run\n").unwrap();

        let app = SalesReportApp::with_args([
            "cmd",
            "--quiet",
            "--no-charts",
            "--orders",
            "20",
            "--log-file",
            log_file.to_str().unwrap(),
        ])
        .unwrap();
        app.execute().unwrap();

        assert_eq!(std::fs::read_to_string(&log_file).unwrap(), "previous run\n");
    }

    #[test]
    fn test_bad_argument() {
        assert!(matches!(
            SalesReportApp::with_args(["cmd", "--orders", "many"]),
            Err(ReportError::Cli(_))
        ));
    }
}
