//! The `vista annotate` command: mark four corner points on an image.
//!
//! A menu-driven terminal session over [`vista_core::Annotator`]. Positions
//! are typed in view pixels (image pixels times the current zoom), arrow keys
//! nudge the selected point, and `--preview` renders the overlay to a PNG so
//! the result can be checked in any image viewer.

use clap::Args;
use console::{Key, Style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use std::path::{Path, PathBuf};

use vista_core::annotate::{open_image, ClickOutcome, DynamicImage};
use vista_core::{render_overlay, Annotator, Config, Direction, Quadrilateral};

use super::theme;

/// Arguments for the `annotate` command.
#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// Image to annotate (prompted for when omitted)
    pub image: Option<PathBuf>,

    /// Where to save the four points as JSON
    #[arg(short, long, default_value = "points.json")]
    pub output: PathBuf,

    /// Write an overlay preview PNG here after every change
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Start from a previously saved points file
    #[arg(long)]
    pub load: Option<PathBuf>,
}

const MENU_ITEMS: &[&str] = &[
    "Add point / select point at position",
    "Select point",
    "Nudge selected point (arrow keys)",
    "Zoom in",
    "Zoom out",
    "Reset points",
    "Save points",
    "Quit",
];

/// Convert a dialoguer result into `Ok(None)` on interrupt (Ctrl+C).
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Execute the annotate command.
pub async fn execute(args: AnnotateArgs, config: Config) -> anyhow::Result<()> {
    let theme = theme::vista_theme();

    let image_path = match args.image.clone() {
        Some(path) => path,
        None => {
            let raw = handle_interrupt(
                Input::<String>::with_theme(&theme)
                    .with_prompt("Image to annotate")
                    .interact_text(),
            )?;
            match raw {
                Some(raw) => PathBuf::from(shellexpand::tilde(raw.trim()).as_ref()),
                None => return Ok(()),
            }
        }
    };

    let image = open_image(&image_path)?;
    let mut annotator = Annotator::new(image.width(), image.height(), config.annotator.clone());
    if let Some(load) = &args.load {
        annotator.load_quad(&Quadrilateral::load(load)?);
    }

    theme::print_banner(&image_path.display().to_string());
    let session = Session {
        image: &image,
        preview: args.preview.as_deref(),
        output: &args.output,
    };
    session.run(&mut annotator, &theme)
}

struct Session<'a> {
    image: &'a DynamicImage,
    preview: Option<&'a Path>,
    output: &'a Path,
}

impl Session<'_> {
    fn run(&self, annotator: &mut Annotator, theme: &ColorfulTheme) -> anyhow::Result<()> {
        let err_style = Style::new().for_stderr().red();

        loop {
            print_state(annotator);
            self.write_preview(annotator);

            let selection = Select::with_theme(theme)
                .with_prompt("Annotate")
                .items(MENU_ITEMS)
                .default(0)
                .interact_opt()?;

            match selection {
                Some(0) => {
                    let raw = handle_interrupt(
                        Input::<String>::with_theme(theme)
                            .with_prompt(format!(
                                "Position in view pixels \"x y\" (zoom {:.2}x)",
                                annotator.zoom()
                            ))
                            .interact_text(),
                    )?;
                    let Some(raw) = raw else { continue };
                    match parse_position(&raw) {
                        Some((x, y)) => {
                            if annotator.click(x, y) == ClickOutcome::Refused {
                                let status = annotator.status();
                                eprintln!("  {} {status}", err_style.apply_to("✗"));
                            }
                        }
                        None => eprintln!(
                            "  {} Expected two numbers, e.g. \"120 45\"",
                            err_style.apply_to("✗")
                        ),
                    }
                }
                Some(1) => {
                    if annotator.points().is_empty() {
                        eprintln!("  No points yet.");
                        continue;
                    }
                    let labels: Vec<String> = annotator
                        .points()
                        .iter()
                        .enumerate()
                        .map(|(i, p)| format!("Point {} ({:.1}, {:.1})", i + 1, p.x, p.y))
                        .collect();
                    let picked = Select::with_theme(theme)
                        .with_prompt("Select point")
                        .items(&labels)
                        .default(annotator.selected().unwrap_or(0))
                        .interact_opt()?;
                    if let Some(i) = picked {
                        annotator.select(i);
                    }
                }
                Some(2) => nudge_loop(annotator)?,
                Some(3) => {
                    annotator.zoom_in();
                }
                Some(4) => {
                    annotator.zoom_out();
                }
                Some(5) => annotator.reset(),
                Some(6) => match annotator.quad() {
                    Ok(quad) => {
                        quad.save(self.output)?;
                        let ok = Style::new().for_stderr().green();
                        eprintln!(
                            "  {} Points saved to {}",
                            ok.apply_to("✓"),
                            self.output.display()
                        );
                    }
                    Err(e) => eprintln!("  {} {e}", err_style.apply_to("✗")),
                },
                Some(7) | None => break,
                _ => unreachable!(),
            }
        }

        Ok(())
    }

    fn write_preview(&self, annotator: &Annotator) {
        let Some(path) = self.preview else { return };
        if let Err(e) = render_overlay(self.image, annotator).save(path) {
            tracing::warn!("Could not write preview {}: {}", path.display(), e);
        }
    }
}

/// Read arrow keys until Enter or Esc; `+`/`-` zoom like a scroll wheel.
fn nudge_loop(annotator: &mut Annotator) -> anyhow::Result<()> {
    if annotator.selected().is_none() {
        eprintln!("  Select a point first.");
        return Ok(());
    }

    let term = Term::stderr();
    term.write_line("  Arrow keys move the point, +/- zoom, Enter or Esc to finish.")?;
    term.write_line(&selected_line(annotator))?;
    loop {
        let key = term.read_key()?;
        let direction = match key {
            Key::ArrowUp => Some(Direction::Up),
            Key::ArrowDown => Some(Direction::Down),
            Key::ArrowLeft => Some(Direction::Left),
            Key::ArrowRight => Some(Direction::Right),
            Key::Char('+') => {
                annotator.wheel(1);
                None
            }
            Key::Char('-') => {
                annotator.wheel(-1);
                None
            }
            Key::Enter | Key::Escape | Key::Char('q') => break,
            _ => continue,
        };
        if let Some(direction) = direction {
            annotator.nudge(direction);
        }
        term.clear_last_lines(1)?;
        term.write_line(&selected_line(annotator))?;
    }
    Ok(())
}

fn selected_line(annotator: &Annotator) -> String {
    match annotator.selected() {
        Some(i) => {
            let p = annotator.points()[i];
            format!(
                "  Point {} at ({:.2}, {:.2}), zoom {:.2}x",
                i + 1,
                p.x,
                p.y,
                annotator.zoom()
            )
        }
        None => format!("  Zoom: {:.2}x", annotator.zoom()),
    }
}

fn print_state(annotator: &Annotator) {
    let dim = Style::new().for_stderr().dim();
    let label = Style::new().for_stderr().bold();
    let (w, h) = annotator.image_size();

    eprintln!();
    eprintln!(
        "  {} {}x{}   {} {:.2}x",
        label.apply_to("Image:"),
        w,
        h,
        label.apply_to("Zoom:"),
        annotator.zoom()
    );
    for (i, p) in annotator.points().iter().enumerate() {
        let marker = if annotator.selected() == Some(i) { "▸" } else { " " };
        eprintln!("   {marker} {}. ({:.1}, {:.1})", i + 1, p.x, p.y);
    }
    if !annotator.status().is_empty() {
        eprintln!("  {}", dim.apply_to(annotator.status()));
    }
    eprintln!();
}

/// Parse `"x y"` or `"x, y"` into finite view coordinates.
fn parse_position(raw: &str) -> Option<(f64, f64)> {
    let mut parts = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty());
    let x: f64 = parts.next()?.parse().ok()?;
    let y: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some((x, y))
}
