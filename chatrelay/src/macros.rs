/// Creates a single chat [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use chatrelay::{Role, cr_msg};
///
/// let message = cr_msg!(assistant => "Done.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.content, "Done.");
/// ```
#[macro_export]
macro_rules! cr_msg {
    (system => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::System, $content)
    };
    (user => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::User, $content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::Assistant, $content)
    };
    (tool($call_id:expr) => $content:expr $(,)?) => {
        $crate::Message::tool_result($call_id, $content)
    };
    ($role:ident => $content:expr $(,)?) => {
        compile_error!("unsupported role: use system, user, assistant, or tool(call_id)");
    };
}

/// Creates a `Vec<Message>` from role/content pairs.
///
/// ```rust
/// use chatrelay::{Role, cr_messages};
///
/// let messages = cr_messages![
///     system => "You are concise.",
///     user => "Summarize this repository.",
/// ];
///
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].role, Role::User);
/// ```
#[macro_export]
macro_rules! cr_messages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::cr_msg!($role => $content)),+]
    };
}

/// Creates a [`Configuration`](crate::Configuration) with provider shorthand support.
///
/// ```rust
/// use chatrelay::{ProviderId, cr_config};
///
/// let config = cr_config!(claude, "claude-sonnet-4-5");
/// assert_eq!(config.provider, ProviderId::Anthropic);
///
/// let config = cr_config!(deepseek, "deepseek-reasoner", max_tokens = 512);
/// assert_eq!(config.options.max_tokens, Some(512));
/// ```
#[macro_export]
macro_rules! cr_config {
    (openai, $model:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::cr_config!(@with $crate::Configuration::new($crate::ProviderId::OpenAi, $model) $(, $key = $value)*)
    };
    (deepseek, $model:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::cr_config!(@with $crate::Configuration::new($crate::ProviderId::DeepSeek, $model) $(, $key = $value)*)
    };
    (anthropic, $model:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::cr_config!(@with $crate::Configuration::new($crate::ProviderId::Anthropic, $model) $(, $key = $value)*)
    };
    (claude, $model:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::cr_config!(@with $crate::Configuration::new($crate::ProviderId::Anthropic, $model) $(, $key = $value)*)
    };
    (qianfan, $model:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::cr_config!(@with $crate::Configuration::new($crate::ProviderId::QianFan, $model) $(, $key = $value)*)
    };
    (@with $config:expr) => {
        $config
    };
    (@with $config:expr, temperature = $value:expr $(, $key:ident = $rest:expr)*) => {
        $crate::cr_config!(@with $config.with_temperature($value) $(, $key = $rest)*)
    };
    (@with $config:expr, max_tokens = $value:expr $(, $key:ident = $rest:expr)*) => {
        $crate::cr_config!(@with $config.with_max_tokens($value) $(, $key = $rest)*)
    };
    (@with $config:expr, reasoning_effort = $value:expr $(, $key:ident = $rest:expr)*) => {
        $crate::cr_config!(@with $config.with_reasoning_effort($value) $(, $key = $rest)*)
    };
    (@with $config:expr, web_search = $value:expr $(, $key:ident = $rest:expr)*) => {
        $crate::cr_config!(@with $config.with_web_search($value) $(, $key = $rest)*)
    };
    ($provider:expr, $model:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::cr_config!(@with $crate::Configuration::new($provider, $model) $(, $key = $value)*)
    };
}
