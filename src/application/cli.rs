use crate::application::{CalendarSnapshot, ThemeApp};
use crate::domain::{Pattern, PosterRef, Theme, ThemeId};
use crate::infrastructure::AssetKind;
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "calendar-chroma")]
#[command(about = "Manage themes that recolor a contribution calendar")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all themes (default)
    List,
    /// Add a new theme, copied from the template or an existing theme
    Add {
        /// Theme to copy
        #[arg(long)]
        from: Option<ThemeId>,
    },
    /// Delete a theme
    Delete { id: ThemeId },
    /// Make a theme the active one
    Select { id: ThemeId },
    /// Rename a theme
    Rename { id: ThemeId, name: String },
    /// Switch a theme between chroma and poster.
    ///
    /// The side switched away from is not stored, so flipping back in a later
    /// run starts from placeholder colors or the default poster.
    Flip { id: ThemeId },
    /// Set the pattern of one bucket of a chroma theme
    SetPattern {
        id: ThemeId,
        index: usize,
        /// Color, bundled icon path, data url or uploaded asset id
        pattern: String,
    },
    /// Set the image of a poster theme
    SetPoster {
        id: ThemeId,
        /// Bundled poster path or uploaded asset id
        reference: String,
    },
    /// Detect thresholds from a calendar snapshot
    Detect { snapshot: PathBuf },
    /// Show which bucket a contribution count falls into
    Classify {
        count: u32,
        /// Theme to use (defaults to the selected one)
        #[arg(short, long)]
        theme: Option<ThemeId>,
        /// Calendar snapshot to detect thresholds from
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },
    /// Print the resolved image url of a poster theme
    Poster { id: ThemeId },
    /// Store an icon given as a data url
    UploadIcon { data_url: String },
    /// Store a poster given as a data url
    UploadPoster { data_url: String },
    /// Delete an uploaded icon or poster by its `@storage/...` id
    RemoveAsset { id: String },
    /// Hide a bundled icon or poster from the galleries
    HideAsset { path: String },
    /// Show a previously hidden bundled asset again
    RestoreAsset { path: String },
    /// List available icons and posters
    Assets,
    /// Delete all themes and assets and start over
    Reset,
}

impl Cli {
    pub fn run() -> Result<()> {
        let cli = Self::parse();
        let mut app = ThemeApp::new()?;

        match cli.command.unwrap_or(Commands::List) {
            Commands::List => print_themes(&app),
            Commands::Add { from } => {
                let registry = app.registry_mut();
                let theme = match from {
                    Some(id) => {
                        let base = registry
                            .get(id)
                            .cloned()
                            .ok_or_else(|| anyhow!("No theme with id {}", id))?;
                        registry.add(&base)?
                    }
                    None => registry.add_default()?,
                };
                println!("Added {}", describe(theme));
            }
            Commands::Delete { id } => {
                let removed = app.registry_mut().delete(id)?;
                println!("Deleted {}", describe(&removed));
            }
            Commands::Select { id } => {
                app.registry_mut().select(id)?;
                println!("Selected theme #{}", id);
            }
            Commands::Rename { id, name } => {
                let theme = app.registry_mut().update(id, |t| t.set_name(name))?;
                println!("Renamed to {}", describe(theme));
            }
            Commands::Flip { id } => {
                let theme = app.registry_mut().update(id, |t| {
                    t.set_variant(t.kind().flipped());
                    Ok(())
                })?;
                println!("Flipped {}", describe(theme));
            }
            Commands::SetPattern { id, index, pattern } => {
                let pattern: Pattern = pattern.parse()?;
                let slots = app
                    .registry()
                    .get(id)
                    .and_then(Theme::patterns)
                    .map(<[Pattern]>::len);
                if let Some(slots) = slots.filter(|slots| index >= *slots) {
                    return Err(anyhow!(
                        "Theme #{} has {} patterns, index {} is out of range",
                        id,
                        slots,
                        index
                    ));
                }
                app.registry_mut()
                    .update(id, |t| t.set_pattern(index, pattern))?;
                println!("Updated pattern {} of theme #{}", index, id);
            }
            Commands::SetPoster { id, reference } => {
                let poster: PosterRef = reference.parse()?;
                app.registry_mut().update(id, |t| t.set_poster(poster))?;
                println!("Updated poster of theme #{}", id);
            }
            Commands::Detect { snapshot } => {
                let snapshot = CalendarSnapshot::from_path(snapshot)?;
                let thresholds = app.detect(&snapshot)?;
                println!("{}", thresholds);
            }
            Commands::Classify {
                count,
                theme,
                snapshot,
            } => {
                let snapshot = snapshot.map(CalendarSnapshot::from_path).transpose()?;
                let page = snapshot
                    .as_ref()
                    .map(|s| s as &dyn crate::domain::CalendarPage);
                let result = app.classify(count, theme, page)?;

                match result.pattern {
                    Some(pattern) => println!(
                        "Theme #{}: bucket {} ({} {})",
                        result.theme_id,
                        result.bucket,
                        pattern.kind(),
                        pattern
                    ),
                    None => println!("Theme #{}: bucket {}", result.theme_id, result.bucket),
                }
            }
            Commands::Poster { id } => match app.poster_url(id)? {
                Some(url) => println!("{}", url),
                None => println!("Theme #{} has no poster image", id),
            },
            Commands::UploadIcon { data_url } => {
                let id = app.registry().assets().upload(AssetKind::Icon, data_url)?;
                println!("{}", id);
            }
            Commands::UploadPoster { data_url } => {
                let id = app
                    .registry()
                    .assets()
                    .upload(AssetKind::Poster, data_url)?;
                println!("{}", id);
            }
            Commands::RemoveAsset { id } => {
                let kind = AssetKind::of_identifier(&id)
                    .ok_or_else(|| anyhow!("{} is not an uploaded asset id", id))?;
                if app.registry().assets().remove(kind, &id)? {
                    println!("Removed {}", id);
                } else {
                    println!("No upload with id {}", id);
                }
            }
            Commands::HideAsset { path } => {
                app.registry().assets().hide_default(&path)?;
                println!("Hid {}", path);
            }
            Commands::RestoreAsset { path } => {
                if app.registry().assets().restore_default(&path)? {
                    println!("Restored {}", path);
                } else {
                    println!("{} was not hidden", path);
                }
            }
            Commands::Assets => print_assets(&app)?,
            Commands::Reset => {
                app.reset()?;
                println!("All themes and assets removed");
            }
        }

        Ok(())
    }
}

fn describe(theme: &Theme) -> String {
    format!(
        "#{} {:?} ({})",
        theme.id().unwrap_or_default(),
        theme.name(),
        theme.kind()
    )
}

fn print_themes(app: &ThemeApp) {
    let registry = app.registry();

    for theme in registry.themes() {
        let marker = if theme.id() == registry.selected_id() {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, describe(theme));
        println!("    thresholds: {}", theme.thresholds());

        if let Some(patterns) = theme.patterns() {
            let patterns: Vec<String> = patterns.iter().map(ToString::to_string).collect();
            println!("    patterns:   {}", patterns.join(" "));
        }
        if let Some(poster) = theme.poster_ref() {
            println!("    poster:     {}", poster);
        }
    }
}

fn print_assets(app: &ThemeApp) -> Result<()> {
    let assets = app.registry().assets();

    for (label, kind) in [("Icons", AssetKind::Icon), ("Posters", AssetKind::Poster)] {
        println!("{}", label);
        for path in assets.visible_defaults(kind)? {
            println!("  {}", path);
        }
        for upload in assets.list(kind)? {
            println!("  {} ({} bytes)", upload.id, upload.data.len());
        }
    }

    let hidden = assets.hidden_defaults()?;
    if !hidden.is_empty() {
        println!("Hidden");
        for path in hidden {
            println!("  {}", path);
        }
    }

    Ok(())
}
