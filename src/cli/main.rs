use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use exif_browser::bridge::{self, Bridge};
use exif_browser::config::Config;
use exif_browser::coordinates;
use exif_browser::exif;
use exif_browser::facade::{ImageDataFacade, ImageField};
use exif_browser::model::ImageData;
use exif_browser::service::{page_count, ImageService};
use exif_browser::settings::{JsonFileStore, SettingsDialog, SettingsService};

#[derive(Parser, Debug)]
#[command(
    name = "exif-browser",
    version,
    about = "Browse a directory of JPEG images and view or edit their EXIF metadata"
)]
struct Cli {
    /// Directory to browse (default: the saved default directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Only print how many JPEG images the directory holds
    #[arg(long)]
    count: bool,

    /// Show one page of the directory, starting at 0
    #[arg(long, value_name = "N")]
    page: Option<usize>,

    /// Images per page (default: scan.page_size from the config)
    #[arg(long, value_name = "P")]
    page_size: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Show the editable fields of one image
    #[arg(long, value_name = "FILE")]
    show: Option<PathBuf>,

    /// Edit a field of the image given with --show (repeatable), e.g. --set f-number=2.8
    #[arg(long = "set", value_name = "FIELD=VALUE", requires = "show")]
    set: Vec<String>,

    /// Preview changes without writing to files
    #[arg(long)]
    dry_run: bool,

    /// Serve the bridge protocol as JSON lines over stdin/stdout
    #[arg(long)]
    serve: bool,

    /// Print the saved settings
    #[arg(long)]
    settings: bool,

    /// Save a new default directory (empty string clears it)
    #[arg(long, value_name = "DIR")]
    default_dir: Option<String>,

    /// Save the dark-mode preference
    #[arg(long, value_name = "on|off", value_parser = parse_on_off)]
    dark_mode: Option<bool>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_on_off(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on or off, got '{other}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, so stdout stays clean for --json and --serve
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config
    let mut config = Config::load(cli.config.as_deref())?;

    // Override dry_run from CLI flag
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if config.output.dry_run {
        log::info!("DRY RUN: no files will be modified");
    }

    // Handle --serve
    if cli.serve {
        log::info!("Serving bridge on stdin/stdout");
        return bridge::stdio::serve_stdio(Arc::new(build_bridge(&config))).await;
    }

    let settings_path = config.settings_path(cli.config.as_deref())?;
    let settings = SettingsService::load(JsonFileStore::new(&settings_path));

    // Handle --default-dir / --dark-mode / --settings
    let edits_settings = cli.default_dir.is_some() || cli.dark_mode.is_some();
    if edits_settings {
        let mut dialog = SettingsDialog::open(&settings);
        if let Some(dir) = &cli.default_dir {
            dialog.set_default_dir(dir.as_str());
        }
        if let Some(dark) = cli.dark_mode {
            dialog.set_dark_mode(dark);
        }
        dialog.save()?;
    }
    if cli.settings {
        let current = settings.current();
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&current)?);
        } else {
            println!();
            println!("{BOLD}Settings:{RESET} {}", settings_path.display());
            println!("{DIM}{}{RESET}", "─".repeat(72));
            print_row(
                "Default directory",
                current.default_dir().map(|d| d.display().to_string()).as_deref().unwrap_or("(none)"),
            );
            print_row("Dark mode", if current.dark_mode { "on" } else { "off" });
            println!();
        }
    }
    if (edits_settings || cli.settings) && cli.dir.is_none() && cli.show.is_none() {
        return Ok(());
    }

    let service = ImageService::new(bridge::spawn(build_bridge(&config)));

    // Handle --show / --set
    if let Some(file) = &cli.show {
        return show_and_edit(&service, file, &cli.set, cli.json).await;
    }

    // Browse a directory
    let dir = match cli.dir.clone().or_else(|| settings.current().default_dir().map(Path::to_path_buf)) {
        Some(dir) => dir,
        None => anyhow::bail!(
            "No directory specified and no default directory saved. Use --default-dir or pass DIR."
        ),
    };
    service.set_current_dir(&dir);

    let total = service.get_images_count(&dir).await?;
    if cli.count {
        if cli.json {
            println!("{}", serde_json::json!({ "dir": dir, "count": total }));
        } else {
            println!("{total}");
        }
        return Ok(());
    }

    let page_size = cli.page_size.unwrap_or(config.scan.page_size);
    match cli.page {
        Some(page) => service.get_images_page(&dir, page, page_size).await?,
        None => service.get_images(&dir).await?,
    }
    let images = service.images();

    if cli.json {
        let json: Vec<serde_json::Value> = images
            .iter()
            .map(|img| serde_json::json!({ "path": img.path, "exif": img.exif }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!();
    match cli.page {
        Some(page) => println!(
            "{BOLD}Directory:{RESET} {}  {DIM}(page {} of {}, {total} images){RESET}",
            dir.display(),
            page + 1,
            page_count(total, page_size).max(1)
        ),
        None => println!("{BOLD}Directory:{RESET} {}  {DIM}({total} images){RESET}", dir.display()),
    }
    println!("{DIM}{}{RESET}", "═".repeat(72));
    if images.is_empty() {
        println!("  {DIM}(no JPEG images){RESET}");
    }
    for image in &images {
        print_summary(image);
    }
    println!();

    Ok(())
}

#[cfg(feature = "dialog")]
fn build_bridge(config: &Config) -> Bridge {
    Bridge::from_config(config, bridge::RfdPicker::default())
}

#[cfg(not(feature = "dialog"))]
fn build_bridge(config: &Config) -> Bridge {
    Bridge::from_config(config, bridge::NoPicker)
}

/// Print the facade for one file, applying `--set` edits and saving them first.
async fn show_and_edit(service: &ImageService, file: &Path, sets: &[String], json: bool) -> Result<()> {
    let image = exif::read_image(file)?;
    let mut facade = ImageDataFacade::new(image);

    for assignment in sets {
        let (key, value) = assignment
            .split_once('=')
            .with_context(|| format!("Expected FIELD=VALUE, got '{assignment}'"))?;
        let field = ImageField::from_key(key).with_context(|| {
            let keys: Vec<&str> = ImageField::ALL.iter().map(|f| f.key()).collect();
            format!("Unknown field '{key}'. Known fields: {}", keys.join(", "))
        })?;
        if let Err(errors) = facade.set(field, value) {
            let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::bail!("{}: {}", field.label(), errors.join("; "));
        }
    }

    let dirty = facade.is_dirty();
    let mut saved = false;
    if dirty {
        let result = service.save_new_exif_value(facade.image().clone()).await?;
        if !result.success {
            anyhow::bail!(
                "Failed to save {}: {}",
                file.display(),
                result.message.unwrap_or_default()
            );
        }
        saved = !result.dry_run;
    }

    if json {
        let fields: serde_json::Map<String, serde_json::Value> = facade
            .properties()
            .iter()
            .map(|p| (p.field.key().to_string(), serde_json::Value::from(p.control.value.clone())))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "path": file,
                "fields": fields,
                "saved": saved,
            }))?
        );
        return Ok(());
    }

    let mut pristine = facade.clone();
    pristine.revert();

    println!();
    println!("{BOLD}File:{RESET} {}", file.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));
    for property in facade.properties() {
        let label = match property.unit {
            Some(unit) => format!("{} ({unit})", property.label),
            None => property.label.to_string(),
        };
        let edited = property.field.format(pristine.image()) != property.control.value;
        if property.control.value.is_empty() {
            println!("  {DIM}{}{RESET}", row(&label, "-"));
        } else if edited {
            print_edited(&label, &property.control.value);
        } else {
            print_row(&label, &property.control.value);
        }
    }
    println!("{DIM}{}{RESET}", "─".repeat(72));
    if dirty {
        println!("  {GREEN}*{RESET} = edited value");
    }
    println!();

    Ok(())
}

/// One directory entry: name plus the fields worth a glance.
fn print_summary(image: &ImageData) {
    let exif = &image.exif;
    println!("  {BOLD}{}{RESET}", image.file_name());

    let camera = [exif.camera_make.as_deref(), exif.camera_model.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !camera.is_empty() {
        print_row("Camera", &camera);
    }
    if let Some(date) = exif.date_time_original {
        print_row("Taken", &date.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    if let (Some(w), Some(h)) = (exif.pixel_x_dimension, exif.pixel_y_dimension) {
        print_row("ImageSize", &format!("{w} x {h}"));
    }
    if let Some(c) = coordinates::to_decimal(exif.gps.as_ref()) {
        print_row("GPS", &format!("{:.5}, {:.5}", c.lat, c.lng));
    }
    if exif.is_empty() {
        println!("  {DIM}{}{RESET}", row("", "(no EXIF metadata found)"));
    }
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Width of the tag column in the EXIF table.
const TAG_WIDTH: usize = 22;

fn row(tag: &str, val: &str) -> String {
    format!("{tag:<TAG_WIDTH$} : {val}")
}

fn print_row(tag: &str, val: &str) {
    println!("  {}", row(tag, val));
}

/// Edited values are green and starred.
fn print_edited(tag: &str, val: &str) {
    println!("  {GREEN}{} *{RESET}", row(tag, val));
}
