//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use climatevision_core::credentials::{FAL_API_KEY, GEMINI_API_KEY};
use climatevision_core::generation::{Resolution, VideoDuration, VideoSettings};
use climatevision_core::reports::{ReportForm, ReportService};
use climatevision_core::scenario::Category;

/// ClimateVision - see climate futures in your own photos
#[derive(Parser, Debug)]
#[command(name = "climatevision", version, about)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Database path (defaults to the app data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Base URL stored objects are served from
    #[arg(long, global = true, default_value = "http://127.0.0.1:54321")]
    pub public_url: String,

    /// Also show notifications on the desktop
    #[arg(long, global = true)]
    pub notify: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay, object, and report server
    Serve(ServeArgs),

    /// Generate a climate image or video from a photo
    #[command(subcommand)]
    Generate(GenerateCommand),

    /// Draft or submit an EcoVoice report
    #[command(subcommand)]
    Report(ReportCommand),

    /// Browse submitted reports
    #[command(subcommand)]
    Reports(ReportsCommand),

    /// Manage locally stored API keys
    #[command(subcommand)]
    Config(ConfigCommand),

    /// List preset scenario descriptions
    Suggestions {
        #[arg(long, value_enum, default_value = "effect")]
        category: CategoryArg,
    },
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value = climatevision_server::DEFAULT_HOST)]
    pub host: String,

    #[arg(long, default_value_t = climatevision_server::DEFAULT_PORT)]
    pub port: u16,

    /// Bucket the relay writes source images to
    #[arg(long, default_value = climatevision_storage::DEFAULT_BUCKET)]
    pub bucket: String,

    /// Provider model path override
    #[arg(long)]
    pub fal_model: Option<String>,

    #[command(flatten)]
    pub video: VideoArgs,
}

#[derive(Subcommand, Debug)]
pub enum GenerateCommand {
    /// Transform a photo with the image model
    Image {
        /// Source photo (PNG, JPEG, WebP, or GIF)
        #[arg(long)]
        image: PathBuf,

        /// Scenario to visualize
        #[arg(long)]
        description: String,

        #[arg(long, value_enum, default_value = "effect")]
        category: CategoryArg,

        /// Directory the result is written to
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Animate a photo with the video model
    Video {
        #[arg(long)]
        image: PathBuf,

        #[arg(long)]
        prompt: String,

        /// Send the request through a relay instead of calling the provider
        #[arg(long)]
        relay_url: Option<String>,

        #[command(flatten)]
        video: VideoArgs,
    },
}

/// Video generation knobs.
#[derive(Args, Debug, Clone)]
pub struct VideoArgs {
    #[arg(long, default_value = "4s", value_parser = parse_duration)]
    pub duration: VideoDuration,

    /// Longer clips and audio both add provider latency
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub audio: bool,

    #[arg(long, default_value = "720p", value_parser = parse_resolution)]
    pub resolution: Resolution,

    /// Seconds to wait before giving up
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

impl VideoArgs {
    pub fn settings(&self) -> VideoSettings {
        VideoSettings {
            duration: self.duration,
            generate_audio: self.audio,
            resolution: self.resolution,
            timeout: Duration::from_secs(self.timeout_secs),
            ..VideoSettings::default()
        }
    }
}

fn parse_duration(s: &str) -> Result<VideoDuration, String> {
    VideoDuration::parse(s).ok_or_else(|| format!("expected 4s or 8s, got {:?}", s))
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
    Resolution::parse(s).ok_or_else(|| format!("expected 720p or 1080p, got {:?}", s))
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Submit a complete report
    Submit(ReportArgs),
    /// Save whatever is filled in as a draft
    Draft(ReportArgs),
}

/// Report form fields.
#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// Continue a previously saved draft
    #[arg(long)]
    pub draft_id: Option<i64>,

    #[arg(long)]
    pub violation_type: Option<String>,
    #[arg(long)]
    pub severity: Option<String>,
    #[arg(long)]
    pub pollutant: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub incident_date: Option<String>,
    #[arg(long)]
    pub incident_time: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub additional_info: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,

    /// Evidence photo
    #[arg(long)]
    pub image: Option<PathBuf>,
}

impl ReportArgs {
    /// Builds the form from the text fields. The photo is attached separately.
    pub fn to_form(&self) -> ReportForm {
        let mut form = ReportForm::default();
        self.apply_to(&mut form);
        form
    }

    /// Starts from the saved draft when `--draft-id` is given, so fields
    /// left off this run keep their saved values.
    pub fn load_form(&self, service: &ReportService) -> climatevision_core::Result<ReportForm> {
        let mut form = match self.draft_id {
            Some(id) => service.resume_draft(id)?,
            None => ReportForm::default(),
        };
        self.apply_to(&mut form);
        Ok(form)
    }

    /// Overwrites only the fields given on the command line.
    pub fn apply_to(&self, form: &mut ReportForm) {
        let fields = [
            (&self.violation_type, &mut form.violation_type),
            (&self.severity, &mut form.severity),
            (&self.pollutant, &mut form.pollutant),
            (&self.location, &mut form.location),
            (&self.incident_date, &mut form.incident_date),
            (&self.incident_time, &mut form.incident_time),
            (&self.description, &mut form.description),
            (&self.additional_info, &mut form.additional_info),
            (&self.name, &mut form.reporter_name),
            (&self.email, &mut form.reporter_email),
            (&self.phone, &mut form.reporter_phone),
        ];
        for (given, field) in fields {
            if let Some(value) = given {
                *field = value.clone();
            }
        }
        if self.draft_id.is_some() {
            form.draft_id = self.draft_id;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ReportsCommand {
    /// Print submitted reports, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Write submitted reports to a CSV file
    Export {
        path: PathBuf,
        #[arg(long, default_value_t = 10_000)]
        limit: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Store an API key
    Set { key: KeyArg, value: String },
    /// Show which keys are stored (masked)
    Show,
    /// Remove a stored key
    Clear { key: KeyArg },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyArg {
    Gemini,
    Fal,
}

impl KeyArg {
    pub fn store_key(&self) -> &'static str {
        match self {
            KeyArg::Gemini => GEMINI_API_KEY,
            KeyArg::Fal => FAL_API_KEY,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryArg {
    Effect,
    Solution,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Effect => Category::Effect,
            CategoryArg::Solution => Category::Solution,
        }
    }
}
