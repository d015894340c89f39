use crate::error::TemplateError;

/// When a child traversal ignores the per-pass cache.
///
/// The comparison is between the scope/context a tag hands to the children
/// and the scope/context the element itself was rendered with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    #[default]
    ScopeOrContext,
    ScopeAndContext,
    ScopeOnly,
    ContextOnly,
    Never,
}

impl RefreshPolicy {
    pub fn should_refresh(self, scope_changed: bool, context_changed: bool) -> bool {
        match self {
            RefreshPolicy::ScopeOrContext => scope_changed || context_changed,
            RefreshPolicy::ScopeAndContext => scope_changed && context_changed,
            RefreshPolicy::ScopeOnly => scope_changed,
            RefreshPolicy::ContextOnly => context_changed,
            RefreshPolicy::Never => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateConfig {
    /// Path segment meaning "the current context itself".
    pub self_token: String,
    /// Separates pairs in multi-pair attributes.
    pub separator: char,
    /// Separates name from path inside one pair.
    pub equals: char,
    pub refresh: RefreshPolicy,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            self_token: "@".to_string(),
            separator: ';',
            equals: ':',
            refresh: RefreshPolicy::default(),
        }
    }
}

impl TemplateConfig {
    pub fn with_self_token(mut self, token: impl Into<String>) -> Self {
        self.self_token = token.into();
        self
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_equals(mut self, equals: char) -> Self {
        self.equals = equals;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        let invalid = |reason: &str| Err(TemplateError::InvalidConfig(reason.to_string()));
        if self.self_token.is_empty() {
            return invalid("self token is empty");
        }
        if self.self_token.contains('.') {
            return invalid("self token contains '.'");
        }
        if self.separator == self.equals {
            return invalid("separator and equals are the same character");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TemplateConfig::default();
        assert_eq!(config.self_token, "@");
        assert_eq!((config.separator, config.equals), (';', ':'));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_ambiguous_settings() {
        for config in [
            TemplateConfig::default().with_self_token(""),
            TemplateConfig::default().with_self_token("a.b"),
            TemplateConfig::default().with_separator(':'),
        ] {
            assert!(matches!(
                config.validate(),
                Err(TemplateError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn refresh_policies() {
        use RefreshPolicy::*;
        let cases = [
            (ScopeOrContext, [false, true, true, true]),
            (ScopeAndContext, [false, false, false, true]),
            (ScopeOnly, [false, true, false, true]),
            (ContextOnly, [false, false, true, true]),
            (Never, [false, false, false, false]),
        ];
        for (policy, expected) in cases {
            let got = [
                policy.should_refresh(false, false),
                policy.should_refresh(true, false),
                policy.should_refresh(false, true),
                policy.should_refresh(true, true),
            ];
            assert_eq!(got, expected, "{policy:?}");
        }
    }
}
