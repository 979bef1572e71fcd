use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::base_info::BaseInfo;

/// A record type stored under one resource prefix.
///
/// One query is bound to exactly one `Model`. The type decides how records
/// decode and which key segment the collection lives under; it is never
/// persisted itself.
///
/// Two optional capabilities are expressed as defaulted methods. A model
/// opts in by overriding them:
///
/// - [`Model::key_prefix`] -- a custom resource prefix. Without it the
///   collection lives under the lower-cased [`Model::type_name`].
/// - [`Model::base_info`] -- access to an embedded [`BaseInfo`], used by the
///   default list order.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Unqualified type name, generic arguments stripped.
    fn type_name() -> String {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_string()
    }

    /// Custom resource prefix for this model, if it declares one.
    fn key_prefix() -> Option<String> {
        None
    }

    /// The embedded identity block, if the model carries one.
    fn base_info(&self) -> Option<&BaseInfo> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct RouteConfig {
        uri: String,
    }

    impl Model for RouteConfig {}

    #[derive(Serialize, Deserialize)]
    struct Wrapper<T> {
        inner: T,
    }

    impl<T: Serialize + DeserializeOwned + Send + Sync + 'static> Model for Wrapper<T> {}

    #[derive(Serialize, Deserialize)]
    struct Upstream {
        #[serde(flatten)]
        base: BaseInfo,
    }

    impl Model for Upstream {
        fn key_prefix() -> Option<String> {
            Some("upstreams".into())
        }

        fn base_info(&self) -> Option<&BaseInfo> {
            Some(&self.base)
        }
    }

    #[test]
    fn type_name_is_unqualified() {
        assert_eq!(RouteConfig::type_name(), "RouteConfig");
    }

    #[test]
    fn type_name_strips_generics() {
        assert_eq!(Wrapper::<RouteConfig>::type_name(), "Wrapper");
    }

    #[test]
    fn capabilities_default_to_absent() {
        let r = RouteConfig { uri: "/".into() };
        assert!(RouteConfig::key_prefix().is_none());
        assert!(r.base_info().is_none());
    }

    #[test]
    fn capabilities_can_be_declared() {
        let u = Upstream { base: BaseInfo::new("1") };
        assert_eq!(Upstream::key_prefix().as_deref(), Some("upstreams"));
        assert_eq!(u.base_info().map(|b| b.id.as_str()), Some("1"));
    }
}
