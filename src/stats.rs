use std::io::Write;

/// Collects statistics of the search for a collision-free table size.
pub trait SearchStatsCollector {
    /// The search calls this method before probing the candidate `modulus`
    /// of the attempt with the given number (counting from 0).
    #[inline(always)] fn attempt(&mut self, _attempt: u32, _modulus: usize) {}

    /// The search calls this method once, with the collision-free `modulus`
    /// found or [`None`] if the attempt budget was exhausted.
    #[inline(always)] fn end(&mut self, _modulus: Option<usize>) {}
}

impl SearchStatsCollector for () {}

/// [`SearchStatsCollector`] that writes one line per probed candidate.
pub struct SearchStatsPrinter<W: Write = std::io::Stdout> {
    writer: W,
}

impl SearchStatsPrinter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self { writer: std::io::stdout() }
    }
}

impl<W: Write> SearchStatsPrinter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> SearchStatsCollector for SearchStatsPrinter<W> {
    fn attempt(&mut self, attempt: u32, modulus: usize) {
        writeln!(self.writer, "{} {}", attempt, modulus).unwrap();
    }

    fn end(&mut self, modulus: Option<usize>) {
        match modulus {
            Some(m) => writeln!(self.writer, "found {}", m).unwrap(),
            None => writeln!(self.writer, "exhausted").unwrap(),
        }
    }
}
