//! `find-me` command-line client.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use find_me_app::config::{PASSWORD_ENV, read_secret};
use find_me_app::{App, AppConfig, AppDeps, AppError, app_version};
use find_me_auth::{Credentials, SignupForm};
use find_me_core::ImageFile;
use find_me_ui::{ResultsPage, Route};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "find-me", version, about = "Find a person across a photo gallery")]
struct Cli {
    /// Backend base URL (overrides FIND_ME_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session token.
    ///
    /// The password is read from FIND_ME_PASSWORD or stdin unless given.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account.
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Clear the stored session.
    Logout,
    /// Show the current user and saved galleries.
    Whoami,
    /// List previous classification runs.
    History,
    /// Classify a gallery against a target photo.
    Find {
        /// Photo of the person to look for.
        #[arg(long)]
        target: PathBuf,
        /// Candidate images, in order.
        #[arg(long = "gallery", required = true, num_args = 1..)]
        gallery: Vec<PathBuf>,
    },
    /// Print the build version.
    Version,
}

fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "command failed");
            eprintln!("find-me: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    if let Command::Version = cli.command {
        println!("find-me {}", app_version());
        return Ok(());
    }

    let config = AppConfig::load().with_api_url(cli.api_url);
    let deps = AppDeps::production(&config)?;
    let mut app = App::new(&config, deps)?;
    let mut stdin = std::io::stdin().lock();

    match cli.command {
        Command::Login { email, password } => {
            let password = read_secret(password, PASSWORD_ENV, "Password", &mut stdin)?;
            app.login(&Credentials { email, password })?;
            println!("Logged in.");
        }
        Command::Signup {
            username,
            email,
            address,
            password,
            confirm_password,
        } => {
            let password = read_secret(password, PASSWORD_ENV, "Password", &mut stdin)?;
            let confirm_password = match confirm_password {
                Some(value) => value,
                None if std::env::var_os(PASSWORD_ENV).is_some() => password.clone(),
                None => read_secret(None, PASSWORD_ENV, "Confirm password", &mut stdin)?,
            };
            let message = app.signup(&SignupForm {
                username,
                email,
                address,
                password,
                confirm_password,
            })?;
            println!("{message}. You can now log in.");
        }
        Command::Logout => {
            app.logout()?;
            println!("Logged out.");
        }
        Command::Whoami => {
            let profile = app.load_profile()?;
            println!("Welcome, {}!", profile.username);
            if profile.saved_galleries.is_empty() {
                println!("You haven't processed any images yet.");
            }
            for url in &profile.saved_galleries {
                println!("  {url}");
            }
        }
        Command::History => {
            let history = app.load_history()?;
            if history.is_empty() {
                println!("No results yet.");
            }
            for record in history {
                println!("{}  target={}", record.created_at, record.target_image_url);
                for url in &record.matched_images {
                    println!("    match {url}");
                }
            }
        }
        Command::Find { target, gallery } => find(&mut app, target, gallery)?,
        Command::Version => {}
    }

    if let Some(notice) = &app.ui().login_notice {
        eprintln!("{notice}");
    }
    Ok(())
}

fn find(app: &mut App, target: PathBuf, gallery: Vec<PathBuf>) -> Result<(), AppError> {
    if app.route() != Route::Home {
        return Err(find_me_client::SubmitError::NotAuthenticated.into());
    }

    if !app.select_target(ImageFile::from_path(&target)?) {
        eprintln!("skipping {}: not an image", target.display());
    }
    let files = gallery
        .iter()
        .map(ImageFile::from_path)
        .collect::<Result<Vec<_>, _>>()?;
    let offered = files.len();
    let accepted = app.add_gallery_files(files);
    if accepted < offered {
        eprintln!("skipped {} non-image gallery file(s)", offered - accepted);
    }

    if let Err(error) = app.submit() {
        if let Some(message) = &app.ui().inline_error {
            eprintln!("{message}");
        }
        return Err(error);
    }

    match app.results_page() {
        ResultsPage::NoResults { title, message } => println!("{title}: {message}"),
        ResultsPage::Sections(sections) => {
            for section in sections {
                println!("{}", section.title);
                if section.images.is_empty() {
                    println!("  {}", section.empty_message);
                }
                for image in section.images {
                    println!("  {}", image.name);
                }
            }
        }
    }
    Ok(())
}
