//! Terminal rendering of the departure countdown and dispatch details.

use console::{Term, style};

use super::icons::{CHECK, CLOCK, TRIKE};
use crate::countdown::Remaining;
use crate::dispatch::Dispatch;

/// One-line countdown text, without styling.
pub fn countdown_line(remaining: Remaining) -> String {
    match remaining {
        Remaining::Unknown => "Departure: --".to_string(),
        Remaining::Seconds(0) => "Departing now".to_string(),
        r => format!("Departs in {}", r),
    }
}

/// Summary lines for a dispatch record.
pub fn dispatch_lines(dispatch: Option<&Dispatch>) -> Vec<String> {
    let Some(d) = dispatch else {
        return vec!["No active dispatch".to_string()];
    };

    let mut lines = vec![format!("Dispatch #{}", d.id)];
    if let Some(number) = &d.tricycle_number {
        lines.push(format!("  Tricycle:   {}", number));
    }
    if let Some(route) = &d.route {
        lines.push(format!("  Route:      {}", route));
    }
    if let Some(driver) = &d.driver_name {
        lines.push(format!("  Driver:     {}", driver));
    }
    if let Some(dispatcher) = &d.dispatcher_name {
        lines.push(format!("  Dispatcher: {}", dispatcher));
    }
    lines.push(format!("  Passengers: {}", d.passenger_count));
    lines.push(format!(
        "  Scheduled:  {}",
        d.scheduled_time.as_deref().unwrap_or("--")
    ));
    lines.push(format!(
        "  Status:     {}",
        if d.is_dispatched { "dispatched" } else { "waiting" }
    ));
    lines
}

/// Live countdown view on stdout. Redraws a single line in place when
/// attached to a terminal and prints one line per update otherwise.
pub struct CountdownView {
    term: Term,
    live: bool,
}

impl CountdownView {
    pub fn new() -> Self {
        let term = Term::stdout();
        let live = term.is_term();
        Self { term, live }
    }

    pub fn show_dispatch(&self, dispatch: Option<&Dispatch>) {
        let mut lines = dispatch_lines(dispatch).into_iter();
        if let Some(header) = lines.next() {
            self.write(&format!("{}{}", TRIKE, style(header).bold()));
        }
        for line in lines {
            self.write(&line);
        }
    }

    pub fn update(&self, remaining: Remaining) {
        let text = countdown_line(remaining);
        let styled = match remaining {
            Remaining::Unknown => style(text).dim(),
            Remaining::Seconds(0) => style(text).green().bold(),
            Remaining::Seconds(s) if s < 60 => style(text).yellow().bold(),
            Remaining::Seconds(_) => style(text).cyan(),
        };
        let icon = if remaining.is_elapsed() { &CHECK } else { &CLOCK };

        if self.live {
            let _ = self.term.clear_line();
            let _ = self.term.write_str(&format!("\r{}{}", icon, styled));
        } else {
            self.write(&format!("{}{}", icon, styled));
        }
    }

    /// End the in-place line so later output starts on a fresh line.
    pub fn finish(&self) {
        if self.live {
            let _ = self.term.write_line("");
        }
    }

    fn write(&self, line: &str) {
        if self.live {
            let _ = self.term.clear_line();
        }
        let _ = self.term.write_line(line);
    }
}

impl Default for CountdownView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_line_variants() {
        assert_eq!(countdown_line(Remaining::Unknown), "Departure: --");
        assert_eq!(countdown_line(Remaining::Seconds(0)), "Departing now");
        assert_eq!(
            countdown_line(Remaining::Seconds(510)),
            "Departs in 8 mins 30 sec"
        );
    }

    #[test]
    fn test_dispatch_lines_without_dispatch() {
        assert_eq!(dispatch_lines(None), vec!["No active dispatch"]);
    }

    #[test]
    fn test_dispatch_lines_include_known_fields() {
        let d = Dispatch {
            id: 42,
            scheduled_time: Some("2024-05-01T08:30:00Z".into()),
            is_dispatched: false,
            passenger_count: 5,
            driver_name: Some("R. Santos".into()),
            dispatcher_name: None,
            tricycle_number: Some("TR-118".into()),
            route: None,
        };
        let lines = dispatch_lines(Some(&d));
        assert_eq!(lines[0], "Dispatch #42");
        assert!(lines.iter().any(|l| l.contains("TR-118")));
        assert!(lines.iter().any(|l| l.contains("R. Santos")));
        assert!(lines.iter().any(|l| l.contains("waiting")));
        assert!(!lines.iter().any(|l| l.contains("Dispatcher")));
    }
}
