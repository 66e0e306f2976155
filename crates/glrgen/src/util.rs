use std::fmt;

/// Wrap a closure into an `impl Display`.
pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct Fmt<F>(F);
    impl<F> fmt::Display for Fmt<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.0)(f)
        }
    }
    Fmt(f)
}

/// The category name with any trailing precedence digits removed.
///
/// `Exp`, `Exp1` and `Exp2` all share the base name `Exp`, which is the unit
/// the derived abstract syntax is keyed on.
pub fn base_name(name: &str) -> &str {
    name.trim_end_matches(|ch: char| ch.is_ascii_digit())
}
