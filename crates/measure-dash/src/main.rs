mod bootstrap;
mod render;

use anyhow::Result;
use dash_core::capture::{self, CaptureRequest};
use dash_core::models::ObjectKey;
use dash_core::settings::{Command, Settings};
use dash_runtime::dashboard::{Dashboard, Window};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level)?;
    bootstrap::ensure_directories(&settings.store_root(), &settings.spool_dir())?;

    tracing::info!("measure-dash v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Bucket: {}, folder: {}, timezone: {}",
        settings.bucket,
        settings.folder_name,
        settings.timezone
    );

    let dashboard = bootstrap::build_dashboard(&settings)?;
    run(&dashboard, &settings).await
}

async fn run(dashboard: &Dashboard, settings: &Settings) -> Result<()> {
    match &settings.command {
        Command::List { start, end, json } => {
            let window = Window::resolve(
                start.as_deref(),
                end.as_deref(),
                today(dashboard),
                dashboard.codec().timezone(),
            )?;
            tracing::debug!(start = %window.start, end = %window.end, "listing window");

            let options = dashboard.browse(&window).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                print!("{}", render::render_options(&options));
            }
        }

        Command::Plot {
            keys,
            x,
            y,
            bins,
            json,
        } => {
            let keys: Vec<ObjectKey> = keys.iter().map(|k| ObjectKey::from(k.as_str())).collect();
            let view = dashboard.plot(&keys, x, y, *bins).await?;

            eprint!("{}", render::render_failures(&view.failures));
            if *json {
                println!("{}", serde_json::to_string_pretty(&view.histogram)?);
            } else {
                print!("{}", render::render_histogram(&view.histogram));
            }
        }

        Command::Show { key } => {
            let content = dashboard.content(&ObjectKey::from(key.as_str())).await?;
            print!("{}", content);
        }

        Command::Capture {
            day,
            hour,
            minute1,
            second1,
            minute2,
            second2,
        } => {
            capture::check_selectable(*day, today(dashboard))?;
            let request =
                CaptureRequest::new(*day, *hour, (*minute1, *second1), (*minute2, *second2))?;
            let id = dashboard.request_capture(&request).await?;
            println!(
                "Request {} sent as message {}. Please wait for it to be loaded into the bucket.",
                request.encode(),
                id
            );
        }
    }

    Ok(())
}

/// Current calendar day in the dashboard's fixed timezone.
fn today(dashboard: &Dashboard) -> chrono::NaiveDate {
    chrono::Utc::now()
        .with_timezone(&dashboard.codec().timezone().tz())
        .date_naive()
}
