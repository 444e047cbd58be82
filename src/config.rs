/// Configuration for constructing a [`crate::peripheral::Peripheral`].
///
/// The only header datum this peripheral consumes from the prologue is the
/// single `default_is_stmt` bit (§1, §3) — the rest of the DWARF-5 prologue
/// (opcode_base, line_base/range, standard_opcode_lengths, file/directory
/// tables) is out of scope and never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Initial value of `default_is_stmt`, applied on construction and on
    /// every subsequent `PROGRAM_HEADER` write (via its bit 0).
    pub default_is_stmt: bool,
}

impl Config {
    /// Creates a new `Config` with default settings.
    ///
    /// Default settings are:
    /// - `default_is_stmt` = `false`.
    pub fn new() -> Self {
        Self {
            default_is_stmt: false,
        }
    }

    /// Sets the initial `default_is_stmt` value.
    pub fn set_default_is_stmt(mut self, default_is_stmt: bool) -> Self {
        self.default_is_stmt = default_is_stmt;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_new() {
        assert_eq!(Config::default(), Config::new());
    }

    #[test]
    fn builder_sets_default_is_stmt() {
        let cfg = Config::new().set_default_is_stmt(false);
        assert!(!cfg.default_is_stmt);
    }
}
