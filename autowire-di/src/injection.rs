//! Injection declarations override the natural token of a constructor parameter, or request a
//! property to be injected after construction. Declarations are kept per owning type name and
//! always take precedence over natural parameter tokens.

use crate::token::Token;
use fxhash::FxHashMap;
use std::borrow::Cow;

/// Place where a declared token gets injected.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum InjectionPoint {
    /// Zero-based constructor parameter position.
    Parameter(usize),
    /// Property assigned via [Injectable::inject_property](crate::provider::Injectable::inject_property).
    Property(Cow<'static, str>),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct InjectionDeclaration {
    /// Owning type name, as produced by [Token::of].
    pub target_type: Token,
    pub point: InjectionPoint,
    /// Token to resolve for the injection point.
    pub token: Token,
}

impl InjectionDeclaration {
    pub fn parameter<TT: Into<Token>, T: Into<Token>>(
        target_type: TT,
        index: usize,
        token: T,
    ) -> Self {
        Self {
            target_type: target_type.into(),
            point: InjectionPoint::Parameter(index),
            token: token.into(),
        }
    }

    pub fn property<TT: Into<Token>, K: Into<Cow<'static, str>>, T: Into<Token>>(
        target_type: TT,
        key: K,
        token: T,
    ) -> Self {
        Self {
            target_type: target_type.into(),
            point: InjectionPoint::Property(key.into()),
            token: token.into(),
        }
    }
}

/// Declarations keyed by owning type name.
pub type InjectionMap = FxHashMap<Token, Vec<InjectionDeclaration>>;

/// Finds the declared token for given constructor parameter.
pub fn parameter_override(declarations: &[InjectionDeclaration], index: usize) -> Option<&Token> {
    declarations
        .iter()
        .find(|declaration| declaration.point == InjectionPoint::Parameter(index))
        .map(|declaration| &declaration.token)
}

/// Iterates over property declarations as `(key, token)` pairs, in declaration order.
pub fn property_overrides(
    declarations: &[InjectionDeclaration],
) -> impl Iterator<Item = (&str, &Token)> {
    declarations
        .iter()
        .filter_map(|declaration| match &declaration.point {
            InjectionPoint::Property(key) => Some((key.as_ref(), &declaration.token)),
            InjectionPoint::Parameter(_) => None,
        })
}

#[cfg(test)]
mod tests {
    use crate::injection::{parameter_override, property_overrides, InjectionDeclaration};
    use crate::token::Token;

    #[test]
    fn should_find_first_parameter_override() {
        let declarations = vec![
            InjectionDeclaration::property("Service", "logger", "LOGGER"),
            InjectionDeclaration::parameter("Service", 1, "SECOND"),
            InjectionDeclaration::parameter("Service", 1, "SHADOWED"),
        ];

        assert_eq!(
            parameter_override(&declarations, 1),
            Some(&Token::from("SECOND"))
        );
        assert!(parameter_override(&declarations, 0).is_none());
    }

    #[test]
    fn should_list_only_properties() {
        let declarations = vec![
            InjectionDeclaration::parameter("Service", 0, "FIRST"),
            InjectionDeclaration::property("Service", "logger", "LOGGER"),
        ];

        assert_eq!(
            property_overrides(&declarations).collect::<Vec<_>>(),
            vec![("logger", &Token::from("LOGGER"))]
        );
    }
}
