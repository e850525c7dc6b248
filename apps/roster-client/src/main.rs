use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use platform_obs::{ObsConfig, init_tracing};
use roster_client::{
    AvatarFile, AvatarImage, EmployeeStatus, HttpRoster, RosterBackend, RosterView,
};

#[derive(Parser, Debug)]
#[command(name = "roster", version, about = "Employee roster client")]
struct Cli {
    /// Base URL of the roster service.
    #[arg(long, env = "ROSTER_API", default_value = "http://localhost:3000")]
    api: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every employee, newest first.
    List,
    /// Add an employee.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "Working")]
        status: EmployeeStatus,
    },
    /// Change an employee's status.
    Status { id: i32, status: EmployeeStatus },
    /// Upload a new avatar image.
    Avatar { id: i32, file: PathBuf },
    /// Remove an employee.
    Delete {
        id: i32,
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let mut obs = ObsConfig::for_service("roster-client");
    obs.env_filter = Some(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()));
    init_tracing(obs)?;

    let cli = Cli::parse();
    let backend = HttpRoster::new(&cli.api)?;
    let mut view = RosterView::new(backend);

    let succeeded = match cli.command {
        Command::List => view.load().await,
        Command::Create {
            name,
            title,
            status,
        } => {
            view.open_create();
            let form = view.form_mut();
            form.name = name;
            form.title = title.unwrap_or_default();
            form.status = status;
            if form.is_blank() {
                anyhow::bail!("employee name must not be blank");
            }
            view.submit_create().await
        }
        Command::Status { id, status } => {
            let ok = view.change_status(id, status).await;
            if ok {
                view.load().await;
            }
            ok
        }
        Command::Avatar { id, file } => {
            let file = AvatarFile::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let ok = view.upload_avatar(id, file).await;
            if ok {
                view.load().await;
            }
            ok
        }
        Command::Delete { id, yes } => {
            let confirmed = yes || {
                view.load().await;
                confirm(id, &view)?
            };
            if !confirmed {
                println!("Delete cancelled.");
                return Ok(());
            }
            view.delete(id, || confirmed).await
        }
    };

    if !succeeded {
        let error = view.error().unwrap_or("operation was not carried out");
        anyhow::bail!("{error}");
    }
    print_roster(&view);
    if let Some(error) = view.error() {
        eprintln!("warning: {error}");
    }
    Ok(())
}

fn confirm<B: RosterBackend>(id: i32, view: &RosterView<B>) -> Result<bool> {
    let name = view
        .employees()
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.name.as_str())
        .unwrap_or("this employee");
    let mut stderr = std::io::stderr();
    write!(stderr, "Delete {name} (#{id})? [y/N] ")?;
    stderr.flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_roster(view: &RosterView<HttpRoster>) {
    if view.employees().is_empty() {
        println!("No employees yet.");
        return;
    }
    let now = chrono::Utc::now().timestamp_millis();
    let base = view.backend().base();
    for employee in view.employees() {
        let avatar = AvatarImage::for_employee(base, employee, now);
        println!(
            "{:>5}  {:<24} {:<20} {:<14} {}",
            employee.id,
            employee.name,
            employee.title.as_deref().unwrap_or("-"),
            employee.status.label(),
            avatar.src,
        );
    }
}
