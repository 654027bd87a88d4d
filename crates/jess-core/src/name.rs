//! Shared name types.

use smol_str::SmolStr;

/// The package reserved for placeholder stubs whose real package could not
/// be inferred.
pub const UNKNOWN_PACKAGE: &str = "unknown";

/// Simple name of the universal placeholder type (`unknown.Unknown`).
pub const UNKNOWN_TYPE_SIMPLE: &str = "Unknown";

const JDK_ROOTS: &[&str] = &["java.", "javax.", "jakarta.", "sun.", "jdk."];

/// A lightweight owned identifier.
///
/// Backed by [`smol_str::SmolStr`], which stores short strings inline and
/// avoids heap allocation in the common case.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Name(SmolStr);

impl Name {
    #[inline]
    pub fn new(text: impl Into<SmolStr>) -> Self {
        Self(text.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Name").field(&self.0.as_str()).finish()
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A fully-qualified type name.
///
/// Packages are separated by `.`; nested type levels by `$`
/// (`pkg.Outer$Inner`). The empty package is allowed for default-package
/// types.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Fqn(SmolStr);

impl Fqn {
    #[inline]
    pub fn new(text: impl Into<SmolStr>) -> Self {
        Self(text.into())
    }

    /// Builds an FQN from a package (possibly empty) and a type name.
    pub fn from_parts(package: &str, type_name: &str) -> Self {
        if package.is_empty() {
            Self::new(type_name)
        } else {
            Self::new(format!("{package}.{type_name}"))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The package part, or `""` for a default-package type.
    pub fn package(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// The type-name part including nesting (`Outer$Inner`).
    pub fn type_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => self.0.as_str(),
        }
    }

    /// The innermost simple name (`Inner` for `pkg.Outer$Inner`).
    pub fn simple_name(&self) -> &str {
        let ty = self.type_name();
        match ty.rfind('$') {
            Some(idx) => &ty[idx + 1..],
            None => ty,
        }
    }

    /// Whether this names a nested type (`$` in the type-name part).
    pub fn is_nested(&self) -> bool {
        self.type_name().contains('$')
    }

    /// The enclosing type's FQN, if this is a nested type.
    pub fn outer(&self) -> Option<Fqn> {
        let ty = self.type_name();
        let dollar = ty.rfind('$')?;
        let pkg_len = self.0.len() - ty.len();
        Some(Fqn::new(&self.0[..pkg_len + dollar]))
    }

    /// FQNs from the top-level type down to `self`
    /// (`pkg.Outer`, `pkg.Outer$Inner`, ...).
    pub fn nesting_chain(&self) -> Vec<Fqn> {
        let ty = self.type_name();
        let pkg_len = self.0.len() - ty.len();
        let mut chain = Vec::new();
        for (idx, _) in ty.match_indices('$') {
            chain.push(Fqn::new(&self.0[..pkg_len + idx]));
        }
        chain.push(self.clone());
        chain
    }

    /// Appends a nested type level.
    pub fn nest(&self, inner: &str) -> Fqn {
        Fqn::new(format!("{}${inner}", self.0))
    }

    /// Whether the FQN is rooted in a JDK package
    /// (`java.*`, `javax.*`, `jakarta.*`, `sun.*`, `jdk.*`).
    pub fn is_jdk(&self) -> bool {
        JDK_ROOTS.iter().any(|root| self.0.starts_with(root))
    }

    /// Whether the FQN lives in the placeholder `unknown` package.
    pub fn is_unknown_package(&self) -> bool {
        self.package() == UNKNOWN_PACKAGE
    }

    /// The binary-name spelling (`pkg/Outer$Inner`) used by classfiles.
    pub fn to_internal_name(&self) -> String {
        self.0.replace('.', "/")
    }

    /// Parses a binary/internal name (`pkg/Outer$Inner`) into an FQN.
    pub fn from_internal_name(internal: &str) -> Self {
        Self::new(internal.replace('/', "."))
    }
}

impl std::fmt::Debug for Fqn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Fqn").field(&self.0.as_str()).finish()
    }
}

impl std::fmt::Display for Fqn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Fqn {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Fqn {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqn_parts() {
        let fqn = Fqn::new("com.example.Outer$Inner$Deep");
        assert_eq!(fqn.package(), "com.example");
        assert_eq!(fqn.type_name(), "Outer$Inner$Deep");
        assert_eq!(fqn.simple_name(), "Deep");
        assert!(fqn.is_nested());
        assert_eq!(fqn.outer().unwrap().as_str(), "com.example.Outer$Inner");
    }

    #[test]
    fn fqn_default_package() {
        let fqn = Fqn::new("Solo");
        assert_eq!(fqn.package(), "");
        assert_eq!(fqn.simple_name(), "Solo");
        assert!(fqn.outer().is_none());
    }

    #[test]
    fn nesting_chain_order() {
        let fqn = Fqn::new("p.A$B$C");
        let chain: Vec<String> = fqn
            .nesting_chain()
            .into_iter()
            .map(|f| f.as_str().to_string())
            .collect();
        assert_eq!(chain, vec!["p.A", "p.A$B", "p.A$B$C"]);
    }

    #[test]
    fn jdk_roots() {
        assert!(Fqn::new("java.util.List").is_jdk());
        assert!(Fqn::new("jakarta.inject.Inject").is_jdk());
        assert!(!Fqn::new("javafake.util.List").is_jdk());
        assert!(!Fqn::new("com.example.Foo").is_jdk());
    }

    #[test]
    fn internal_name_round_trip() {
        let fqn = Fqn::new("com.example.Outer$Inner");
        assert_eq!(fqn.to_internal_name(), "com/example/Outer$Inner");
        assert_eq!(Fqn::from_internal_name("com/example/Outer$Inner"), fqn);
    }
}
