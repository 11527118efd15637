//! Name → constructor mapping for input plugins.

use std::{collections::BTreeMap, fmt};

use super::{Input, InputPlugin};

/// Creates a zero-valued instance of a plugin.
pub type InputConstructor = Box<dyn Fn() -> Box<dyn Input> + Send + Sync>;

/// The input plugins that can be used in the configuration.
///
/// The registry is filled once, before loading the configuration, and only read afterwards.
/// Build one with [`static_inputs`](crate::static_inputs) or [`InputRegistry::register`].
#[derive(Default)]
pub struct InputRegistry {
    constructors: BTreeMap<String, InputConstructor>,
}

/// Creates an [`InputRegistry`] containing static plugins.
///
/// Each argument must be a _type_ that implements the [`InputPlugin`] trait.
///
/// # Example
/// ```ignore
/// use tally::plugin::InputRegistry;
///
/// let registry: InputRegistry = static_inputs![PluginA, PluginB];
/// ```
///
/// Attributes are supported:
/// ```ignore
/// let registry = static_inputs![
///     #[cfg(target_os = "linux")]
///     LinuxOnlyPlugin
/// ];
/// ```
#[macro_export]
macro_rules! static_inputs {
    // ```
    // static_inputs![MyPluginA, ...];
    // ```
    //
    // desugars to:
    // ```
    // let mut registry = InputRegistry::new();
    // registry.register_static::<MyPluginA>();
    // ...
    // ```
    [] => {
        $crate::plugin::InputRegistry::new()
    };
    [$( $(#[$m:meta])* $x:path ),+ $(,)?] => {
    //  ^^^^^^^^^^^^^^ accepts zero or more #[attribute]
        {
            let mut registry = $crate::plugin::InputRegistry::new();
            $(
                $(#[$m])* // expands the attributes, if any
                registry.register_static::<$x>();
            )*
            registry
        }
    }
}

impl InputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin constructor under `name`.
    ///
    /// If a plugin with the same name was already registered, it is replaced.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Input> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            log::warn!("input plugin '{name}' registered twice, the last registration wins");
        }
        self.constructors.insert(name, Box::new(constructor));
    }

    /// Registers a plugin written in Rust, under its [`name`](InputPlugin::name).
    pub fn register_static<P: InputPlugin>(&mut self) {
        self.register(<P as InputPlugin>::name(), || Box::new(P::default()) as Box<dyn Input>);
    }

    /// Gets the constructor of the plugin `name`.
    pub fn lookup(&self, name: &str) -> Option<&InputConstructor> {
        self.constructors.get(name)
    }

    /// Creates a fresh instance of the plugin `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn Input>> {
        self.lookup(name).map(|constructor| constructor())
    }

    /// Returns the names of the registered plugins, in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for InputRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::InputRegistry;
    use crate::plugin::{Input, InputPlugin};

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct Cpu {
        percpu: bool,
    }

    impl InputPlugin for Cpu {
        fn name() -> &'static str {
            "cpu"
        }

        fn description() -> &'static str {
            "Read metrics about cpu usage"
        }
    }

    #[derive(Debug, Default, Deserialize)]
    struct Mem {}

    impl InputPlugin for Mem {
        fn name() -> &'static str {
            "mem"
        }

        fn description() -> &'static str {
            "Read metrics about memory usage"
        }
    }

    #[test]
    fn static_inputs_macro() {
        let empty: InputRegistry = crate::static_inputs![];
        assert!(empty.is_empty());

        let single = crate::static_inputs![Cpu];
        assert_eq!(1, single.len());
        assert!(single.lookup("cpu").is_some());

        // Accept single identifiers and qualified paths.
        let multiple = crate::static_inputs![self::Mem, Cpu,];
        assert_eq!(multiple.names().collect::<Vec<_>>(), vec!["cpu", "mem"]);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let registry = crate::static_inputs![Cpu];
        assert!(registry.lookup("CPU").is_none());
        assert!(registry.create("cpux").is_none());
    }

    #[test]
    fn constructor_gives_fresh_instances() {
        let registry = crate::static_inputs![Cpu];
        let mut a = registry.create("cpu").unwrap();
        a.configure(toml::toml! { percpu = true }).unwrap();
        let b = registry.create("cpu").unwrap();
        assert!(a.as_any().downcast_ref::<Cpu>().unwrap().percpu);
        assert!(!b.as_any().downcast_ref::<Cpu>().unwrap().percpu);
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = crate::static_inputs![Cpu];
        registry.register("cpu", || Box::new(Mem::default()) as Box<dyn Input>);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.create("cpu").unwrap().name(), "mem");
    }
}
