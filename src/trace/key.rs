//! Folding a trace into its flame-graph grouping key.

use super::Trace;

/// Folds a non-empty trace into a `;`-joined root-to-leaf key.
///
/// The first rendered segment (the call root of the folded line) is
/// `"<point> (<basename>)"` with the line number dropped and only the file's
/// base name kept; every other segment is the bare point.
pub fn fold_trace(trace: &Trace) -> String {
    let mut segments: Vec<String> = Vec::with_capacity(trace.len());

    for frame in trace.iter().rev() {
        if segments.is_empty() {
            segments.push(format!("{} ({})", frame.point, location_basename(&frame.location)));
        } else {
            segments.push(frame.point.clone());
        }
    }

    segments.join(";")
}

/// Extracts the file base name from a `file:line` location.
fn location_basename(location: &str) -> &str {
    let file = location.split(':').next().unwrap_or(location);
    file.rsplit('/').next().unwrap_or(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Frame;

    fn frame(point: &str, location: &str) -> Frame {
        Frame {
            point: point.to_string(),
            location: location.to_string(),
        }
    }

    #[test]
    fn test_folds_root_to_leaf_with_basename_on_root() {
        let trace = vec![
            frame("usleep", "<internal>:-1"),
            frame("<main>", "<internal>:-1"),
        ];
        assert_eq!(fold_trace(&trace), "<main> (<internal>);usleep");
    }

    #[test]
    fn test_basename_strips_directories_and_line() {
        let trace = vec![
            frame("Runner::tick", "/app/src/Runner.php:42"),
            frame("<main>", "/app/app.php:1"),
        ];
        assert_eq!(fold_trace(&trace), "<main> (app.php);Runner::tick");
    }

    #[test]
    fn test_single_frame_trace() {
        let trace = vec![frame("<main>", "/app/app.php:1")];
        assert_eq!(fold_trace(&trace), "<main> (app.php)");
    }

    #[test]
    fn test_location_without_line_suffix() {
        let trace = vec![frame("spin", "<closure>")];
        assert_eq!(fold_trace(&trace), "spin (<closure>)");
    }
}
