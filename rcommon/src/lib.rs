//! Shared primitives and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use rcommon::{GenerationOptions, MetadataMap, ReasoningEffort, TurnId};
//!
//! let turn = TurnId::from("turn-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("tenant".to_string(), "acme".to_string());
//!
//! let options = GenerationOptions::default()
//!     .with_temperature(0.3)
//!     .with_reasoning_effort(ReasoningEffort::High);
//! assert_eq!(turn.as_str(), "turn-1");
//! assert_eq!(options.reasoning_effort, Some(ReasoningEffort::High));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use rcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Shared metadata and the turn identifier newtype.
    //!
    //! ```rust
    //! use rcommon::{MetadataMap, TurnId};
    //!
    //! let turn = TurnId::new("turn-42");
    //! let mut metadata = MetadataMap::new();
    //! metadata.insert("env".to_string(), "test".to_string());
    //!
    //! assert_eq!(turn.to_string(), "turn-42");
    //! ```

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub type MetadataMap = HashMap<String, String>;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct TurnId(String);

    impl TurnId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        /// Generates a process-unique id of the form `turn-<millis>-<seq>`.
        pub fn generate() -> Self {
            static SEQUENCE: AtomicU64 = AtomicU64::new(0);

            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or_default();
            let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
            Self(format!("turn-{millis}-{sequence}"))
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for TurnId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for TurnId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for TurnId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod model {
    //! Shared generation settings used by per-call configuration.
    //!
    //! ```rust
    //! use rcommon::{GenerationOptions, ImageSize, ReasoningEffort};
    //!
    //! let options = GenerationOptions::default()
    //!     .with_temperature(0.2)
    //!     .with_max_tokens(128)
    //!     .with_reasoning_effort(ReasoningEffort::Low)
    //!     .with_image_size(ImageSize::new(1024, 1024))
    //!     .enable_web_search();
    //!
    //! assert_eq!(options.temperature, Some(0.2));
    //! assert_eq!(options.max_tokens, Some(128));
    //! assert!(options.web_search);
    //! assert_eq!(options.image_size.map(|size| size.to_string()), Some("1024x1024".into()));
    //! ```

    use std::fmt::{Display, Formatter};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ReasoningEffort {
        Low,
        Medium,
        High,
    }

    impl ReasoningEffort {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Low => "low",
                Self::Medium => "medium",
                Self::High => "high",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value.trim().to_ascii_lowercase().as_str() {
                "low" => Some(Self::Low),
                "medium" => Some(Self::Medium),
                "high" => Some(Self::High),
                _ => None,
            }
        }
    }

    impl Display for ReasoningEffort {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageSize {
        pub width: u32,
        pub height: u32,
    }

    impl ImageSize {
        pub fn new(width: u32, height: u32) -> Self {
            Self { width, height }
        }
    }

    impl Display for ImageSize {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}x{}", self.width, self.height)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GenerationOptions {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
        pub reasoning_effort: Option<ReasoningEffort>,
        pub web_search: bool,
        pub image_size: Option<ImageSize>,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }

        pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
            self.reasoning_effort = Some(effort);
            self
        }

        pub fn with_web_search(mut self, web_search: bool) -> Self {
            self.web_search = web_search;
            self
        }

        pub fn enable_web_search(self) -> Self {
            self.with_web_search(true)
        }

        pub fn with_image_size(mut self, size: ImageSize) -> Self {
            self.image_size = Some(size);
            self
        }
    }
}

pub mod registry {
    //! Generic registry map wrapper used by runtime registries.
    //!
    //! ```rust
    //! use rcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert!(registry.contains_key("alpha"));
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.remove(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.items.keys()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use context::{MetadataMap, TurnId};
pub use future::BoxFuture;
pub use model::{GenerationOptions, ImageSize, ReasoningEffort};
pub use registry::Registry;
