//! Compiler and linker flag collections.
//!
//! Flags are opaque tokens kept in the order they were added. Nothing is
//! deduplicated or reordered: repeating a flag (or `-l` ordering) is
//! meaningful to compilers and linkers.

/// Read access to C, C++ and linker flags.
///
/// Every accessor returns an owned snapshot.
pub trait CompilerOptions: std::fmt::Debug {
    fn cflags(&self) -> Vec<String>;

    fn cxxflags(&self) -> Vec<String>;

    fn ldflags(&self) -> Vec<String>;
}

/// A single set of compiler and linker flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOption {
    cflags: Vec<String>,
    cxxflags: Vec<String>,
    ldflags: Vec<String>,
}

impl CompilerOption {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a C compiler flag.
    pub fn add_cflag(&mut self, flag: impl Into<String>) {
        self.cflags.push(flag.into());
    }

    /// Add a C++ compiler flag.
    pub fn add_cxxflag(&mut self, flag: impl Into<String>) {
        self.cxxflags.push(flag.into());
    }

    /// Add a linker flag.
    pub fn add_ldflag(&mut self, flag: impl Into<String>) {
        self.ldflags.push(flag.into());
    }

    /// Builder-style variant of [`add_cflag`](Self::add_cflag).
    pub fn cflag(mut self, flag: impl Into<String>) -> Self {
        self.add_cflag(flag);
        self
    }

    pub fn cxxflag(mut self, flag: impl Into<String>) -> Self {
        self.add_cxxflag(flag);
        self
    }

    pub fn ldflag(mut self, flag: impl Into<String>) -> Self {
        self.add_ldflag(flag);
        self
    }

    /// Build an option set from three flag lists.
    pub fn from_flags<I, S>(cflags: I, cxxflags: I, ldflags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CompilerOption {
            cflags: cflags.into_iter().map(Into::into).collect(),
            cxxflags: cxxflags.into_iter().map(Into::into).collect(),
            ldflags: ldflags.into_iter().map(Into::into).collect(),
        }
    }
}

impl CompilerOptions for CompilerOption {
    fn cflags(&self) -> Vec<String> {
        self.cflags.clone()
    }

    fn cxxflags(&self) -> Vec<String> {
        self.cxxflags.clone()
    }

    fn ldflags(&self) -> Vec<String> {
        self.ldflags.clone()
    }
}

/// Several option sets viewed as one.
///
/// Each flag list is the concatenation of the children's lists in
/// registration order.
#[derive(Debug, Default)]
pub struct CompilerOptionAggregate {
    options: Vec<Box<dyn CompilerOptions>>,
}

impl CompilerOptionAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register another option set after the existing ones.
    pub fn add(&mut self, option: impl CompilerOptions + 'static) {
        self.options.push(Box::new(option));
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    fn collect(&self, flags: impl Fn(&dyn CompilerOptions) -> Vec<String>) -> Vec<String> {
        self.options
            .iter()
            .flat_map(|option| flags(option.as_ref()))
            .collect()
    }
}

impl CompilerOptions for CompilerOptionAggregate {
    fn cflags(&self) -> Vec<String> {
        self.collect(|o| o.cflags())
    }

    fn cxxflags(&self) -> Vec<String> {
        self.collect(|o| o.cxxflags())
    }

    fn ldflags(&self) -> Vec<String> {
        self.collect(|o| o.ldflags())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshots_are_copies() {
        let option = CompilerOption::new().cflag("-O2");
        let mut snapshot = option.cflags();
        snapshot.push("-g".to_string());

        assert_eq!(option.cflags(), vec!["-O2"]);
    }

    #[test]
    fn test_aggregate_preserves_order_and_duplicates() {
        let first = CompilerOption::new()
            .cflag("-O2")
            .ldflag("-lfoo")
            .ldflag("-lbar");
        let second = CompilerOption::new()
            .cflag("-O2")
            .cxxflag("-std=c++17")
            .ldflag("-lfoo");

        let mut aggregate = CompilerOptionAggregate::new();
        aggregate.add(first);
        aggregate.add(second);

        assert_eq!(aggregate.len(), 2);
        assert_eq!(aggregate.cflags(), vec!["-O2", "-O2"]);
        assert_eq!(aggregate.cxxflags(), vec!["-std=c++17"]);
        assert_eq!(aggregate.ldflags(), vec!["-lfoo", "-lbar", "-lfoo"]);
    }

    #[test]
    fn test_nested_aggregate() {
        let mut inner = CompilerOptionAggregate::new();
        inner.add(CompilerOption::new().cflag("-a"));
        inner.add(CompilerOption::new().cflag("-b"));

        let mut outer = CompilerOptionAggregate::new();
        outer.add(CompilerOption::new().cflag("-first"));
        outer.add(inner);

        assert_eq!(outer.cflags(), vec!["-first", "-a", "-b"]);
    }

    #[test]
    fn test_from_flags() {
        let option = CompilerOption::from_flags(vec!["-O3"], vec!["-fno-rtti"], vec![]);
        assert_eq!(option.cflags(), vec!["-O3"]);
        assert_eq!(option.cxxflags(), vec!["-fno-rtti"]);
        assert!(option.ldflags().is_empty());
    }
}
