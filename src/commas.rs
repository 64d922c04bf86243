//! Separator emitter used while building comma-joined SQL fragments.

/// Emits a space the first time and a comma every time after, until reset.
///
/// ```rust
/// use sql_rowbind::commas::Commas;
///
/// let mut comma = Commas::new();
/// let mut stmt = String::from("select");
/// for col in ["a", "b", "c"] {
///     stmt.push(comma.get());
///     stmt.push_str(col);
/// }
/// assert_eq!(stmt, "select a,b,c");
/// ```
#[derive(Debug, Default)]
pub struct Commas {
    times_called: u32,
}

impl Commas {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the separator: a space on the first call, a comma afterwards.
    pub fn get(&mut self) -> char {
        let first = self.times_called == 0;
        self.times_called += 1;
        if first { ' ' } else { ',' }
    }

    /// Number of `get` calls since construction or the last `reset`.
    #[must_use]
    pub fn times_called(&self) -> u32 {
        self.times_called
    }

    /// Start over, as if freshly constructed.
    pub fn reset(&mut self) {
        self.times_called = 0;
    }
}
