//! Inline form field validation.
//!
//! Fields opt in through markup: `type="email"`, `minlength="n"`,
//! `data-match="<other field id>"`, `data-validate`, `required`. Each
//! validation produces a [`FieldState`]; rules run in a fixed order and the
//! first failure wins.
//!
//! Feedback is rendered on the field, on its wrapper (`label.input` or
//! `.input-wrapper`) and in a hint paragraph placed after the fieldset's
//! label wrapper:
//!
//! | State | Field/wrapper class | Hint |
//! |-------|---------------------|------|
//! | Untouched, or empty value | none | cleared |
//! | Valid | `input-success` | cleared |
//! | Invalid, errors revealed | `input-error` | message shown |
//! | Invalid, errors suppressed | none | unchanged |

use std::cell::RefCell;
use std::fmt;

use regex::Regex;
use tracing::{debug, trace};

use crate::config::ValidationConfig;
use crate::dom::{Dom, Selector};
use crate::error::{ConfigError, Result};

const SUCCESS_CLASS: &str = "input-success";
const ERROR_CLASS: &str = "input-error";
const HINT_CLASS: &str = "validator-hint";

/// A declarative check attached to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    /// Value must match the engine's email pattern. From `type="email"`.
    EmailFormat,
    /// Trimmed value must have at least this many characters. From `minlength`.
    MinLength(usize),
    /// Value must equal the value of the field with this id. From `data-match`.
    MatchesField(String),
}

/// Validity of one field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldState {
    /// Empty and optional: nothing to check.
    #[default]
    Untouched,
    Valid,
    /// Failed; carries the first failing rule's message.
    Invalid(String),
}

impl FieldState {
    /// Whether the field lets the form submit.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Invalid(message) => Some(message),
            _ => None,
        }
    }
}

/// Fields [`ValidationEngine::validate_form`] checks.
pub fn field_selector() -> Selector {
    let input = || Selector::tag("input");
    input()
        .and(Selector::attr_eq("type", "email"))
        .or(input().and(Selector::attr("data-validate")))
        .or(input().and(Selector::attr("data-match")))
}

fn wrapper_selector() -> Selector {
    Selector::tag("label")
        .and(Selector::class("input"))
        .or(Selector::class("input-wrapper"))
}

/// Validates fields of one document and renders inline feedback.
pub struct ValidationEngine<D: Dom> {
    dom: D,
    config: ValidationConfig,
    email: Regex,
    states: RefCell<Vec<(D::Node, FieldState)>>,
}

impl<D: Dom> fmt::Debug for ValidationEngine<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("email_pattern", &self.email.as_str())
            .field("tracked_fields", &self.states.borrow().len())
            .finish()
    }
}

impl<D: Dom> ValidationEngine<D> {
    /// Create an engine, compiling the configured email pattern.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidPattern` if the pattern does not compile.
    pub fn new(dom: D, config: ValidationConfig) -> Result<Self> {
        let email = Regex::new(&config.email_pattern).map_err(|source| {
            ConfigError::InvalidPattern {
                pattern: config.email_pattern.clone(),
                source,
            }
        })?;
        Ok(Self {
            dom,
            config,
            email,
            states: RefCell::new(Vec::new()),
        })
    }

    /// Rules declared on `field`, in evaluation order.
    pub fn rules_for(&self, field: &D::Node) -> Vec<ValidationRule> {
        let dom = &self.dom;
        let mut rules = Vec::new();
        if dom
            .attribute(field, "type")
            .is_some_and(|t| t.eq_ignore_ascii_case("email"))
        {
            rules.push(ValidationRule::EmailFormat);
        }
        if let Some(raw) = dom.attribute(field, "minlength") {
            match raw.trim().parse::<usize>() {
                Ok(min) => rules.push(ValidationRule::MinLength(min)),
                Err(_) => debug!(minlength = %raw, "Ignoring unparsable minlength"),
            }
        }
        if let Some(target) = dom.attribute(field, "data-match") {
            if !target.is_empty() {
                rules.push(ValidationRule::MatchesField(target));
            }
        }
        rules
    }

    /// Validate one field and render the result.
    ///
    /// With `reveal_errors` false (live input) an invalid field is not
    /// highlighted and its message is not shown; valid styling still is.
    pub fn validate_field(&self, field: &D::Node, reveal_errors: bool) -> FieldState {
        let dom = &self.dom;
        let raw = dom.value(field);
        let value = raw.trim();
        let required = dom.has_attribute(field, "required");

        let state = if value.is_empty() {
            if required {
                FieldState::Invalid(self.config.required_message.clone())
            } else {
                FieldState::Untouched
            }
        } else {
            self.evaluate(field, value)
        };

        if value.is_empty() {
            self.clear(field);
        } else {
            self.render(field, &state, reveal_errors);
        }

        trace!(state = ?state, reveal_errors, "Field validated");
        self.record(field, state.clone());
        state
    }

    /// Validate every matching field inside `form` with errors revealed.
    /// Returns `true` when all of them are valid.
    pub fn validate_form(&self, form: &D::Node) -> bool {
        self.forget_detached();
        let fields = self.dom.query_all(Some(form), &field_selector());
        let mut all_valid = true;
        for field in &fields {
            if !self.validate_field(field, true).is_valid() {
                all_valid = false;
            }
        }
        debug!(fields = fields.len(), valid = all_valid, "Form validated");
        all_valid
    }

    /// Last computed state of `field`; Untouched if never validated.
    pub fn state_of(&self, field: &D::Node) -> FieldState {
        self.states
            .borrow()
            .iter()
            .find(|(node, _)| node == field)
            .map(|(_, state)| state.clone())
            .unwrap_or_default()
    }

    /// Drop state for fields no longer in the document. Also runs on every
    /// validation and on each host tick.
    pub fn forget_detached(&self) {
        self.states
            .borrow_mut()
            .retain(|(node, _)| self.dom.is_connected(node));
    }

    pub fn tracked_fields(&self) -> usize {
        self.states.borrow().len()
    }

    fn evaluate(&self, field: &D::Node, value: &str) -> FieldState {
        for rule in self.rules_for(field) {
            if let Some(message) = self.check(&rule, value) {
                return FieldState::Invalid(message);
            }
        }
        FieldState::Valid
    }

    fn check(&self, rule: &ValidationRule, value: &str) -> Option<String> {
        match rule {
            ValidationRule::EmailFormat => {
                (!self.email.is_match(value)).then(|| self.config.email_message.clone())
            }
            ValidationRule::MinLength(min) => (value.chars().count() < *min).then(|| {
                self.config
                    .min_length_message
                    .replace("{min}", &min.to_string())
            }),
            ValidationRule::MatchesField(id) => match self.dom.element_by_id(id) {
                Some(target) => (value != self.dom.value(&target))
                    .then(|| self.config.match_message.clone()),
                None => {
                    debug!(target = %id, "Match target not found");
                    None
                }
            },
        }
    }

    fn record(&self, field: &D::Node, state: FieldState) {
        let mut states = self.states.borrow_mut();
        states.retain(|(node, _)| node == field || self.dom.is_connected(node));
        match states.iter_mut().find(|(node, _)| node == field) {
            Some(entry) => entry.1 = state,
            None => states.push((field.clone(), state)),
        }
    }

    fn render(&self, field: &D::Node, state: &FieldState, reveal_errors: bool) {
        let dom = &self.dom;
        let wrapper = dom.closest(field, &wrapper_selector());
        let targets: Vec<&D::Node> = std::iter::once(field).chain(wrapper.as_ref()).collect();
        for node in &targets {
            dom.remove_class(node, ERROR_CLASS);
            dom.remove_class(node, SUCCESS_CLASS);
        }

        match state {
            FieldState::Valid | FieldState::Untouched => {
                for node in &targets {
                    dom.add_class(node, SUCCESS_CLASS);
                }
                if let Some(hint) = self.hint_for(field) {
                    self.hide_hint(&hint);
                }
            }
            FieldState::Invalid(message) if reveal_errors => {
                for node in &targets {
                    dom.add_class(node, ERROR_CLASS);
                }
                if let Some(hint) = self.hint_for(field) {
                    dom.set_text(&hint, message);
                    dom.remove_class(&hint, "opacity-0");
                    dom.add_class(&hint, "text-error");
                    dom.add_class(&hint, "opacity-100");
                }
            }
            FieldState::Invalid(_) => {}
        }
    }

    fn clear(&self, field: &D::Node) {
        let dom = &self.dom;
        dom.remove_class(field, ERROR_CLASS);
        dom.remove_class(field, SUCCESS_CLASS);
        if let Some(wrapper) = dom.closest(field, &wrapper_selector()) {
            dom.remove_class(&wrapper, ERROR_CLASS);
            dom.remove_class(&wrapper, SUCCESS_CLASS);
        }
        if let Some(hint) = self.existing_hint(field) {
            self.hide_hint(&hint);
        }
    }

    fn hide_hint(&self, hint: &D::Node) {
        let dom = &self.dom;
        dom.set_text(hint, "");
        dom.remove_class(hint, "text-error");
        dom.remove_class(hint, "opacity-100");
        dom.add_class(hint, "opacity-0");
    }

    fn existing_hint(&self, field: &D::Node) -> Option<D::Node> {
        let fieldset = self.dom.closest(field, &Selector::tag("fieldset"))?;
        self.dom.query(Some(&fieldset), &Selector::class(HINT_CLASS))
    }

    /// Hint paragraph for `field`, created after the fieldset's label
    /// wrapper on first use.
    fn hint_for(&self, field: &D::Node) -> Option<D::Node> {
        let dom = &self.dom;
        let fieldset = dom.closest(field, &Selector::tag("fieldset"))?;
        if let Some(hint) = dom.query(Some(&fieldset), &Selector::class(HINT_CLASS)) {
            return Some(hint);
        }
        let label = dom.query(
            Some(&fieldset),
            &Selector::tag("label").and(Selector::class("input")),
        )?;
        let hint = dom.create_element("p")?;
        for class in [HINT_CLASS, "text-xs", "mt-1", "transition-all", "duration-200"] {
            dom.add_class(&hint, class);
        }
        dom.insert_after(&label, &hint);
        Some(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_dom::{MemoryDom, NodeId};

    fn engine(dom: &MemoryDom) -> ValidationEngine<MemoryDom> {
        ValidationEngine::new(dom.clone(), ValidationConfig::default()).unwrap()
    }

    /// `<fieldset><label class="input"><input ...></label></fieldset>`
    fn field(dom: &MemoryDom, parent: &NodeId, attrs: &[(&str, &str)]) -> NodeId {
        let fieldset = dom.element("fieldset").child_of(parent);
        let label = dom.element("label").class("input").child_of(&fieldset);
        let mut input = dom.element("input");
        for (name, value) in attrs {
            input = input.attr(name, value);
        }
        input.child_of(&label)
    }

    fn hint(dom: &MemoryDom, input: &NodeId) -> Option<NodeId> {
        let fieldset = dom.closest(input, &Selector::tag("fieldset")).unwrap();
        dom.query(Some(&fieldset), &Selector::class(HINT_CLASS))
    }

    #[test]
    fn test_rules_in_order() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(
            &dom,
            &body,
            &[("type", "email"), ("minlength", "5"), ("data-match", "other")],
        );
        assert_eq!(
            engine(&dom).rules_for(&input),
            vec![
                ValidationRule::EmailFormat,
                ValidationRule::MinLength(5),
                ValidationRule::MatchesField("other".into()),
            ]
        );
    }

    #[test]
    fn test_unparsable_minlength_is_ignored() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("minlength", "eight")]);
        assert!(engine(&dom).rules_for(&input).is_empty());
    }

    #[test]
    fn test_email_format() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("type", "email")]);
        let engine = engine(&dom);

        dom.set_value(&input, "a@b");
        assert!(matches!(engine.validate_field(&input, true), FieldState::Invalid(_)));
        dom.set_value(&input, "a@b.com");
        assert_eq!(engine.validate_field(&input, true), FieldState::Valid);
    }

    #[test]
    fn test_min_length_message_contains_number() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("data-validate", ""), ("minlength", "8")]);
        let engine = engine(&dom);

        dom.set_value(&input, "short");
        let state = engine.validate_field(&input, true);
        assert!(state.message().unwrap().contains('8'));
        dom.set_value(&input, "longenough");
        assert_eq!(engine.validate_field(&input, true), FieldState::Valid);
    }

    #[test]
    fn test_min_length_counts_trimmed_chars() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("minlength", "3")]);
        let engine = engine(&dom);

        dom.set_value(&input, "  ab  ");
        assert!(!engine.validate_field(&input, false).is_valid());
        dom.set_value(&input, "äöü");
        assert!(engine.validate_field(&input, false).is_valid());
    }

    #[test]
    fn test_first_failure_wins() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("type", "email"), ("minlength", "20")]);
        let engine = engine(&dom);

        dom.set_value(&input, "nope");
        assert_eq!(
            engine.validate_field(&input, true),
            FieldState::Invalid(ValidationConfig::default().email_message)
        );
    }

    #[test]
    fn test_matches_field() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let password = field(&dom, &body, &[("id", "password"), ("data-validate", "")]);
        let confirm = field(&dom, &body, &[("data-match", "password")]);
        let engine = engine(&dom);

        dom.set_value(&password, "hunter22");
        dom.set_value(&confirm, "hunter22");
        assert_eq!(engine.validate_field(&password, true), FieldState::Valid);
        assert_eq!(engine.validate_field(&confirm, true), FieldState::Valid);

        dom.set_value(&confirm, "hunter23");
        assert!(!engine.validate_field(&confirm, true).is_valid());
        assert_eq!(engine.validate_field(&password, true), FieldState::Valid);
    }

    #[test]
    fn test_match_compares_against_untrimmed_target() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let password = field(&dom, &body, &[("id", "password"), ("data-validate", "")]);
        let confirm = field(&dom, &body, &[("data-match", "password")]);
        let engine = engine(&dom);

        dom.set_value(&password, "secret ");
        dom.set_value(&confirm, "secret");
        assert!(!engine.validate_field(&confirm, true).is_valid());

        dom.set_value(&password, "secret");
        dom.set_value(&confirm, " secret ");
        assert_eq!(engine.validate_field(&confirm, true), FieldState::Valid);
    }

    #[test]
    fn test_missing_match_target_passes() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let confirm = field(&dom, &body, &[("data-match", "ghost")]);
        dom.set_value(&confirm, "anything");
        assert_eq!(engine(&dom).validate_field(&confirm, true), FieldState::Valid);
    }

    #[test]
    fn test_empty_optional_field_is_untouched_and_unstyled() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("type", "email")]);
        let wrapper = dom.parent(input).unwrap();
        let engine = engine(&dom);

        for reveal in [false, true] {
            assert_eq!(engine.validate_field(&input, reveal), FieldState::Untouched);
            assert!(dom.classes(input).is_empty());
            assert_eq!(dom.classes(wrapper), vec!["input"]);
        }
    }

    #[test]
    fn test_empty_required_field_is_invalid_without_styling() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("type", "email"), ("required", "")]);
        let state = engine(&dom).validate_field(&input, true);
        assert!(!state.is_valid());
        assert!(dom.classes(input).is_empty());
    }

    #[test]
    fn test_clearing_value_removes_styling() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("type", "email")]);
        let engine = engine(&dom);

        dom.set_value(&input, "bad");
        engine.validate_field(&input, true);
        assert!(dom.has_class(&input, ERROR_CLASS));

        dom.set_value(&input, "");
        engine.validate_field(&input, true);
        assert!(!dom.has_class(&input, ERROR_CLASS));
        let hint = hint(&dom, &input).unwrap();
        assert_eq!(dom.text(&hint), "");
        assert!(dom.has_class(&hint, "opacity-0"));
    }

    #[test]
    fn test_reveal_controls_error_styling() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("type", "email")]);
        let wrapper = dom.parent(input).unwrap();
        let engine = engine(&dom);

        dom.set_value(&input, "bad");
        assert!(!engine.validate_field(&input, false).is_valid());
        assert!(!dom.has_class(&input, ERROR_CLASS));
        assert!(hint(&dom, &input).is_none());

        engine.validate_field(&input, true);
        assert!(dom.has_class(&input, ERROR_CLASS));
        assert!(dom.has_class(&wrapper, ERROR_CLASS));
        let hint_node = hint(&dom, &input).unwrap();
        assert_eq!(dom.text(&hint_node), ValidationConfig::default().email_message);
        assert!(dom.has_class(&hint_node, "text-error"));
    }

    #[test]
    fn test_valid_styling_applies_during_input() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("type", "email")]);
        dom.set_value(&input, "a@b.com");
        engine(&dom).validate_field(&input, false);
        assert!(dom.has_class(&input, SUCCESS_CLASS));
        assert!(dom.has_class(&dom.parent(input).unwrap(), SUCCESS_CLASS));
    }

    #[test]
    fn test_hint_created_once_after_label() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("type", "email")]);
        let label = dom.parent(input).unwrap();
        let fieldset = dom.parent(label).unwrap();
        let engine = engine(&dom);

        dom.set_value(&input, "bad");
        engine.validate_field(&input, true);
        engine.validate_field(&input, true);
        dom.set_value(&input, "a@b.com");
        engine.validate_field(&input, true);

        let children = dom.children(fieldset);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], label);
        assert!(dom.has_class(&children[1], HINT_CLASS));
    }

    #[test]
    fn test_field_without_fieldset_gets_no_hint() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = dom.element("input").attr("type", "email").child_of(&body);
        dom.set_value(&input, "bad");
        engine(&dom).validate_field(&input, true);
        assert!(dom.has_class(&input, ERROR_CLASS));
        assert_eq!(dom.children(body), vec![input]);
    }

    #[test]
    fn test_validate_form_checks_every_field() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let form = dom.element("form").child_of(&body);
        let email = field(&dom, &form, &[("type", "email")]);
        let name = field(&dom, &form, &[("data-validate", ""), ("minlength", "2")]);
        let outside = field(&dom, &body, &[("type", "email")]);
        let engine = engine(&dom);

        dom.set_value(&email, "bad");
        dom.set_value(&name, "x");
        dom.set_value(&outside, "also bad");
        assert!(!engine.validate_form(&form));
        assert!(dom.has_class(&email, ERROR_CLASS));
        assert!(dom.has_class(&name, ERROR_CLASS));
        assert!(dom.classes(outside).is_empty());

        dom.set_value(&email, "a@b.com");
        dom.set_value(&name, "Al");
        assert!(engine.validate_form(&form));
    }

    #[test]
    fn test_state_forgotten_when_field_removed() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let input = field(&dom, &body, &[("type", "email")]);
        let engine = engine(&dom);
        dom.set_value(&input, "a@b.com");
        engine.validate_field(&input, false);
        assert_eq!(engine.state_of(&input), FieldState::Valid);

        let fieldset = dom.parent(dom.parent(input).unwrap()).unwrap();
        dom.remove(&fieldset);
        engine.forget_detached();
        assert_eq!(engine.tracked_fields(), 0);
        assert_eq!(engine.state_of(&input), FieldState::Untouched);
    }

    #[test]
    fn test_live_validation_prunes_removed_fields() {
        let dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let engine = engine(&dom);
        let inputs: Vec<NodeId> = (0..100)
            .map(|_| field(&dom, &body, &[("type", "email")]))
            .collect();
        for input in &inputs {
            dom.set_value(input, "a@b.com");
            engine.validate_field(input, false);
        }
        assert_eq!(engine.tracked_fields(), 100);

        for input in &inputs {
            dom.remove(&dom.parent(dom.parent(*input).unwrap()).unwrap());
        }
        let survivor = field(&dom, &body, &[("type", "email")]);
        dom.set_value(&survivor, "x@y.org");
        engine.validate_field(&survivor, false);
        assert_eq!(engine.tracked_fields(), 1);
        assert_eq!(engine.state_of(&inputs[0]), FieldState::Untouched);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let dom = MemoryDom::new();
        let config = ValidationConfig {
            email_pattern: "([".into(),
            ..ValidationConfig::default()
        };
        let err = ValidationEngine::new(dom, config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_field_selector_css() {
        assert_eq!(
            field_selector().to_css(),
            "input[type=\"email\"], input[data-validate], input[data-match]"
        );
    }
}
