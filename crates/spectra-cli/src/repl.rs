use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use spectra_core::error::SpectraError;
use spectra_core::extract::BandEdge;
use spectra_core::session::Session;
use tracing::debug;

use crate::styles::Styles;

const HELP: &str = "\
Loading
  open <file>               open a FITS image or a .dat spectrum
Image
  rotate <degrees>          rotate the image (clockwise positive)
  upper | lower             pick the next row for that band edge
  row <y>                   select a row while picking a band edge
  band <lower> <upper>      set both band edges
  extract                   average the band into a spectrum
Calibration points
  mark                      start marking calibration points
  point <x> <wavelength>    mark a point (snaps to the local maximum)
  unmark <x>                remove the point at pixel x
  points                    list the working points
  load-points <file>        replace the working points from a file
  save-points [file]        save the working points
Review
  review                    open the review list
  delete <i> | restore <i>  tombstone or restore entry i
  modify <i> <x|-> <w|->    edit entry i ('-' keeps a field)
  commit | cancel           keep the live entries or discard the review
Wavelength solution
  fit                       fit the wavelength solution
  calibrate                 apply it to the spectrum
  load-cal <file>           load and fit a points file
  save-cal [file]           save the solution's points
  save [file]               save the spectrum
Other
  done                      leave band/point picking
  status | help | quit";

/// One parsed REPL line.
#[derive(Debug, PartialEq)]
pub enum Command {
    Open(PathBuf),
    Rotate(String),
    Edge(BandEdge),
    Row(f64),
    Band(f64, f64),
    Extract,
    Mark,
    Point(f64, String),
    Unmark(usize),
    Points,
    LoadPoints(PathBuf),
    SavePoints(Option<PathBuf>),
    Review,
    Delete(usize),
    Restore(usize),
    Modify {
        index: usize,
        pixel: Option<String>,
        wavelength: Option<String>,
    },
    Commit,
    Cancel,
    Fit,
    Calibrate,
    LoadCal(PathBuf),
    SaveCal(Option<PathBuf>),
    Save(Option<PathBuf>),
    Done,
    Status,
    Help,
    Quit,
}

/// Parse a REPL line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match name {
        "open" => Command::Open(required_path(rest, "open <file>")?),
        "rotate" => Command::Rotate(required(rest, "rotate <degrees>")?.to_string()),
        "upper" => Command::Edge(BandEdge::Upper),
        "lower" => Command::Edge(BandEdge::Lower),
        "row" => Command::Row(number(&args, 0, "row <y>")?),
        "band" => Command::Band(
            number(&args, 0, "band <lower> <upper>")?,
            number(&args, 1, "band <lower> <upper>")?,
        ),
        "extract" => Command::Extract,
        "mark" => Command::Mark,
        "point" => {
            let pixel = number(&args, 0, "point <x> <wavelength>")?;
            let wavelength = args
                .get(1)
                .ok_or_else(|| usage("point <x> <wavelength>"))?;
            Command::Point(pixel, (*wavelength).to_string())
        }
        "unmark" => Command::Unmark(number(&args, 0, "unmark <x>")?),
        "points" => Command::Points,
        "load-points" => Command::LoadPoints(required_path(rest, "load-points <file>")?),
        "save-points" => Command::SavePoints(optional_path(rest)),
        "review" => Command::Review,
        "delete" => Command::Delete(number(&args, 0, "delete <i>")?),
        "restore" => Command::Restore(number(&args, 0, "restore <i>")?),
        "modify" => {
            const USAGE: &str = "modify <i> <x|-> <wavelength|->";
            if args.len() != 3 {
                return Err(usage(USAGE));
            }
            Command::Modify {
                index: number(&args, 0, USAGE)?,
                pixel: keep_marker(args[1]),
                wavelength: keep_marker(args[2]),
            }
        }
        "commit" => Command::Commit,
        "cancel" => Command::Cancel,
        "fit" => Command::Fit,
        "calibrate" => Command::Calibrate,
        "load-cal" => Command::LoadCal(required_path(rest, "load-cal <file>")?),
        "save-cal" => Command::SaveCal(optional_path(rest)),
        "save" => Command::Save(optional_path(rest)),
        "done" => Command::Done,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

fn usage(text: &str) -> String {
    format!("Usage: {text}")
}

fn required<'a>(rest: &'a str, text: &str) -> std::result::Result<&'a str, String> {
    if rest.is_empty() {
        Err(usage(text))
    } else {
        Ok(rest)
    }
}

fn required_path(rest: &str, text: &str) -> std::result::Result<PathBuf, String> {
    required(rest, text).map(PathBuf::from)
}

fn optional_path(rest: &str) -> Option<PathBuf> {
    (!rest.is_empty()).then(|| PathBuf::from(rest))
}

fn number<T: std::str::FromStr>(
    args: &[&str],
    index: usize,
    text: &str,
) -> std::result::Result<T, String> {
    args.get(index)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| usage(text))
}

fn keep_marker(arg: &str) -> Option<String> {
    (arg != "-").then(|| arg.to_string())
}

pub struct Repl {
    session: Session,
    styles: Styles,
}

impl Repl {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            styles: Styles::new(),
        }
    }

    /// Read commands from stdin until `quit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        println!("{}", self.styles.prompt.apply_to("spectra session (type 'help')"));
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            print!("{} ", self.styles.prompt.apply_to(">"));
            io::stdout().flush()?;
            let Some(line) = lines.next() else {
                println!();
                break;
            };
            if !self.execute(&line?) {
                break;
            }
        }
        Ok(())
    }

    /// Run one line. Returns `false` when the session should end.
    pub fn execute(&mut self, line: &str) -> bool {
        match parse_command(line) {
            Ok(Some(Command::Quit)) => false,
            Ok(Some(command)) => {
                if let Err(err) = self.dispatch(command) {
                    self.report(&err);
                }
                true
            }
            Ok(None) => true,
            Err(message) => {
                println!("{}", self.styles.error.apply_to(message));
                true
            }
        }
    }

    fn dispatch(&mut self, command: Command) -> spectra_core::error::Result<()> {
        debug!(?command, "Dispatching");
        let status = match command {
            Command::Open(path) => self.session.open(&path)?,
            Command::Rotate(angle) => self.session.rotate_input(&angle)?,
            Command::Edge(edge) => self.session.begin_band_selection(edge)?,
            Command::Row(y) => self.session.select_row(y)?,
            Command::Band(lower, upper) => self.session.select_band(lower, upper)?,
            Command::Extract => self.session.extract()?,
            Command::Mark => self.session.begin_marking()?,
            Command::Point(x, wavelength) => self.session.mark_point(x, &wavelength)?,
            Command::Unmark(x) => self.session.unmark(x)?,
            Command::Points => {
                self.print_points();
                return Ok(());
            }
            Command::LoadPoints(path) => self.session.load_points(&path)?,
            Command::SavePoints(path) => self.session.save_points(path.as_deref())?,
            Command::Review => {
                let status = self.session.begin_review()?;
                self.print_status(&status);
                self.print_review();
                return Ok(());
            }
            Command::Delete(i) => {
                let entry = self.session.review_mut()?.delete(i)?;
                format!("Deleted #{i}: pixel {} -> {}", entry.pixel, entry.wavelength)
            }
            Command::Restore(i) => {
                let entry = self.session.review_mut()?.restore(i)?;
                format!("Restored #{i}: pixel {} -> {}", entry.pixel, entry.wavelength)
            }
            Command::Modify {
                index,
                pixel,
                wavelength,
            } => {
                let entry = self.session.review_mut()?.modify(
                    index,
                    pixel.as_deref(),
                    wavelength.as_deref(),
                )?;
                format!(
                    "Modified #{index}: pixel {} -> {}",
                    entry.pixel, entry.wavelength
                )
            }
            Command::Commit => self.session.commit_review()?,
            Command::Cancel => self.session.cancel_review()?,
            Command::Fit => self.session.compute_calibration()?,
            Command::Calibrate => self.session.calibrate()?,
            Command::LoadCal(path) => self.session.load_calibration(&path)?,
            Command::SaveCal(path) => self.session.save_calibration(path.as_deref())?,
            Command::Save(path) => self.session.save_spectrum(path.as_deref())?,
            Command::Done => {
                self.session.end_interaction();
                format!("Mode: {}", self.session.mode())
            }
            Command::Status => self.session.status(),
            Command::Help => {
                println!("{HELP}");
                return Ok(());
            }
            Command::Quit => return Ok(()),
        };
        self.print_status(&status);
        Ok(())
    }

    fn print_status(&self, status: &str) {
        println!("{}", self.styles.status.apply_to(status));
    }

    fn report(&self, err: &SpectraError) {
        println!(
            "{} {}",
            self.styles.error.apply_to(format!("{}:", err.kind())),
            err
        );
    }

    fn print_points(&self) {
        let s = &self.styles;
        match self.session.points() {
            Some(points) if !points.is_empty() => {
                println!("  {:>8}  {}", s.label.apply_to("pixel"), s.label.apply_to("wavelength"));
                for (pixel, wavelength) in points.iter() {
                    println!("  {:>8}  {}", pixel, s.value.apply_to(wavelength));
                }
            }
            Some(_) => println!("{}", s.label.apply_to("No calibration points")),
            None => println!("{}", s.label.apply_to("No spectrum loaded")),
        }
    }

    fn print_review(&self) {
        let s = &self.styles;
        let Some(review) = self.session.review() else {
            return;
        };
        for (i, entry) in review.entries().iter().enumerate() {
            let line = format!("  #{i:<3} {:>8}  {}", entry.pixel, entry.wavelength);
            if entry.deleted {
                println!("{} {}", s.deleted.apply_to(line), s.deleted.apply_to("(deleted)"));
            } else {
                println!("{line}");
            }
        }
    }
}
