//! Command line and environment configuration

use crate::api::ProfileUpdate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_SPLIT_METERS: f64 = 50.0;
pub const DEFAULT_DEMO_POINTS: usize = 600;

#[derive(Parser, Debug)]
#[command(name = "project-map", version)]
#[command(about = "Project area map with clustered points and task split preview", long_about = None)]
pub struct Cli {
    /// Backend API base URL
    #[arg(long, env = "PROJECT_MAP_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Directory for the log file
    #[arg(long, env = "PROJECT_MAP_LOG_DIR", default_value = DEFAULT_LOG_DIR, global = true)]
    pub log_dir: PathBuf,

    #[command(flatten)]
    pub view: ViewArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Project area GeoJSON
    #[arg(long)]
    pub area: Option<PathBuf>,

    /// Task split GeoJSON; computed from the area when omitted
    #[arg(long)]
    pub split: Option<PathBuf>,

    /// Point GeoJSON shown as clusters
    #[arg(long)]
    pub points: Option<PathBuf>,

    /// Side of a task square in metres
    #[arg(long, default_value_t = DEFAULT_SPLIT_METERS)]
    pub split_meters: f64,

    /// Sample points generated when no point file is given
    #[arg(long, default_value_t = DEFAULT_DEMO_POINTS)]
    pub demo_points: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Open the map (default)
    View,
    /// Sign in with username and password
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "PROJECT_MAP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Start the Google sign-in flow
    GoogleLogin,
    /// Finish the Google sign-in flow with the redirect's query string
    Callback { query: Option<String> },
    /// Sign out
    Logout {
        #[arg(long, env = "PROJECT_MAP_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Update profile details
    Profile(ProfileArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(long)]
    pub user_id: u64,
    #[arg(long, env = "PROJECT_MAP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    #[arg(long)]
    pub phone_number: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub organization_name: Option<String>,
    #[arg(long)]
    pub organization_address: Option<String>,
    #[arg(long)]
    pub job_title: Option<String>,
    #[arg(long)]
    pub notify_for_projects_within_km: Option<u32>,
    #[arg(long)]
    pub drone_you_own: Option<String>,
    #[arg(long)]
    pub experience_years: Option<u32>,
    #[arg(long)]
    pub certified_drone_operator: Option<bool>,
}

impl ProfileArgs {
    pub fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            phone_number: self.phone_number.clone(),
            country: self.country.clone(),
            city: self.city.clone(),
            organization_name: self.organization_name.clone(),
            organization_address: self.organization_address.clone(),
            job_title: self.job_title.clone(),
            notify_for_projects_within_km: self.notify_for_projects_within_km,
            drone_you_own: self.drone_you_own.clone(),
            experience_years: self.experience_years,
            certified_drone_operator: self.certified_drone_operator,
        }
    }
}

/// Resolved settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub log_dir: PathBuf,
    pub view: ViewArgs,
    pub command: Command,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            api_url: cli.api_url,
            log_dir: cli.log_dir,
            view: cli.view,
            command: cli.command.unwrap_or(Command::View),
        }
    }
}

impl Config {
    /// Whether the run opens the terminal map
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, Command::View)
    }
}
