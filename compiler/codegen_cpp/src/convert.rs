//! Checking expressions against the types they are used as.

use crate::Generator;
use ast::{BareExpression, Constant, Expression};
use diagnostics::{Diag, Result};
use hir::{is_builtin_type, last_segment, Primitive, Type};
use typer::{check_integer_range, default_type, intersection_of, is_assignable, value_type};
use utility::{Atom, Int, QuoteExt, ToPrimitive};

impl Generator<'_, '_> {
    /// Compile an expression used as a value of the expected type.
    ///
    /// Fails if the value does not fit the type. Number literals are checked to be in the range
    /// of the expected type and displays are compiled element by element.
    pub(crate) fn convert(&mut self, expression: &Expression, expected: &Type) -> Result<String> {
        if let Type::Optional(inner) = expected {
            if is_display(expression) {
                return self.convert(expression, inner);
            }
        }

        if let BareExpression::Constant(Constant::None) = expression.bare {
            return self.none_value(expression, expected);
        }

        if let Some(display) = self.display(expression, expected)? {
            return Ok(display);
        }

        if let BareExpression::Conditional(conditional) = &expression.bare {
            let condition = self.condition(&conditional.condition)?;
            let body = self.convert(&conditional.body, expected)?;
            let orelse = self.convert(&conditional.orelse, expected)?;
            return Ok(format!("({condition} ? {body} : {orelse})"));
        }

        let actual = value_type(self.context, expression)?;
        let narrowed = self.narrow(&actual, expected, expression)?;
        self.emit(expression, &narrowed)
    }

    /// Compile an expression used as a value of its own type.
    pub(crate) fn expression(&mut self, expression: &Expression) -> Result<String> {
        Ok(self.value(expression)?.0)
    }

    /// Compile an expression together with the type it is compiled as.
    pub(crate) fn value(&mut self, expression: &Expression) -> Result<(String, Type)> {
        let type_ = default_type(&value_type(self.context, expression)?);
        let code = self.convert(expression, &type_)?;
        Ok((code, type_))
    }

    pub(crate) fn condition(&mut self, expression: &Expression) -> Result<String> {
        self.convert(expression, &Type::BOOL)
    }

    /// The type a value of the actual type is compiled as where the expected type is required.
    fn narrow(&self, actual: &Type, expected: &Type, expression: &Expression) -> Result<Type> {
        if let Type::Optional(inner) = expected {
            if actual.is_none() {
                return Ok(expected.clone());
            }
            if !matches!(actual, Type::Optional(_)) {
                return self.narrow(actual, inner, expression);
            }
        }

        if let Some(type_) = intersection_of(actual, expected) {
            return Ok(type_);
        }

        match (actual, expected) {
            (Type::Named(class), Type::Named(trait_)) if self.is_trait(trait_) => {
                if is_assignable(self.context, actual, expected) {
                    return Ok(actual.clone());
                }
                return Err(Diag::error()
                    .message(format!(
                        "class {} does not implement trait {}",
                        last_segment(class).quote(),
                        last_segment(trait_).quote()
                    ))
                    .unlabeled_span(expression));
            }
            (Type::Named(_), Type::Weak(inner)) if **inner == *actual => return Ok(actual.clone()),
            _ => {}
        }

        Err(Diag::error()
            .message(format!(
                "types {} and {} differ",
                default_type(actual).quote(),
                expected.quote()
            ))
            .unlabeled_span(expression))
    }

    fn is_trait(&self, name: &str) -> bool {
        name == Atom::ERROR.to_str() || self.context.registry.trait_(name).is_some()
    }

    pub(crate) fn none_value(&self, expression: &Expression, expected: &Type) -> Result<String> {
        match expected {
            Type::Optional(inner) if !self.is_nullable(inner) => {
                Ok(format!("mys::optional<{}>()", self.cpp_type(inner)))
            }
            Type::Optional(_) => Ok("nullptr".to_owned()),
            expected if self.is_nullable(expected) => Ok("nullptr".to_owned()),
            expected => Err(Diag::error()
                .message(format!("'None' cannot be converted to {}", expected.quote()))
                .unlabeled_span(expression)),
        }
    }

    /// Compile a container display of the expected type, `None` if the expression is not such
    /// a display.
    pub(crate) fn display(&mut self, expression: &Expression, expected: &Type) -> Result<Option<String>> {
        let object = self.object_type(expected);

        Ok(Some(match (&expression.bare, expected) {
            (BareExpression::List(elements), Type::List(element)) => {
                let elements = self.convert_all(elements, element)?;
                format!(
                    "mys::make_shared<{object}>(std::vector<{}>({{{elements}}}))",
                    self.cpp_type(element)
                )
            }
            (BareExpression::Set(elements), Type::Set(element)) => {
                let elements = self.convert_all(elements, element)?;
                format!(
                    "mys::make_shared<{object}>(std::unordered_set<{}>({{{elements}}}))",
                    self.cpp_type(element)
                )
            }
            // `{}` is an empty dict syntactically
            (BareExpression::Dict(items), Type::Set(_)) if items.is_empty() => {
                format!("mys::make_shared<{object}>()")
            }
            (BareExpression::Dict(items), Type::Dict(key, value)) => {
                let mut entries = Vec::new();
                for (key_expression, value_expression) in items {
                    let key = self.convert(key_expression, key)?;
                    let value = self.convert(value_expression, value)?;
                    entries.push(format!("{{{key}, {value}}}"));
                }
                format!(
                    "mys::make_shared<{object}>(std::unordered_map<{}, {}>({{{}}}))",
                    self.cpp_type(key),
                    self.cpp_type(value),
                    entries.join(", ")
                )
            }
            (BareExpression::Tuple(elements), Type::Tuple(types)) if elements.len() == types.len() => {
                let mut values = Vec::new();
                for (element, type_) in elements.iter().zip(types) {
                    values.push(self.convert(element, type_)?);
                }
                format!("mys::make_shared<{object}>({})", values.join(", "))
            }
            _ => return Ok(None),
        }))
    }

    fn convert_all(&mut self, elements: &[Expression], expected: &Type) -> Result<String> {
        let mut values = Vec::new();
        for element in elements {
            values.push(self.convert(element, expected)?);
        }
        Ok(values.join(", "))
    }

    /// Compile a literal as a value of the given type.
    pub(crate) fn literal(&self, constant: &Constant, type_: &Type, expression: &Expression) -> Result<String> {
        Ok(match constant {
            Constant::Integer(value) => match type_ {
                Type::Primitive(primitive) => self.integer(value, *primitive, expression)?,
                _ => return Err(unexpected_literal(expression, type_)),
            },
            Constant::Float(text) => match type_ {
                Type::Primitive(Primitive::F32) => format!("f32({text}f)"),
                Type::Primitive(Primitive::F64) => format!("f64({text})"),
                _ => return Err(unexpected_literal(expression, type_)),
            },
            Constant::String(text) => format!("String(\"{}\")", escape(text)),
            Constant::Char(character) => char_literal(*character),
            Constant::Bytes(bytes) => format!(
                "Bytes({{{}}})",
                bytes.iter().map(u8::to_string).collect::<Vec<_>>().join(", ")
            ),
            Constant::Bool(value) => value.to_string(),
            Constant::None => self.none_value(expression, type_)?,
        })
    }

    /// Compile an integer literal, possibly negated, as a value of the given type.
    pub(crate) fn integer(&self, value: &Int, primitive: Primitive, expression: &Expression) -> Result<String> {
        check_integer_range(value, primitive, expression.span)?;

        let name = primitive.name();
        Ok(match primitive {
            Primitive::I64 if value.to_i64() == Some(i64::MIN) => "INT64_MIN".to_owned(),
            Primitive::U64 if value.to_i64().is_none() => format!("{name}({value}ull)"),
            _ => format!("{name}({value})"),
        })
    }

    /// Whether values of the type can be raised.
    pub(crate) fn is_error(&self, type_: &Type) -> bool {
        match type_ {
            Type::Named(name) => {
                is_builtin_type(name)
                    || self
                        .context
                        .class(name)
                        .is_some_and(|class| class.is_error())
            }
            _ => false,
        }
    }
}

fn is_display(expression: &Expression) -> bool {
    matches!(
        expression.bare,
        BareExpression::List(_)
            | BareExpression::Set(_)
            | BareExpression::Dict(_)
            | BareExpression::Tuple(_)
    )
}

fn unexpected_literal(expression: &Expression, type_: &Type) -> Diag {
    Diag::error()
        .message(format!(
            "literal {} cannot be converted to {}",
            expression.quote(),
            type_.quote()
        ))
        .unlabeled_span(expression)
}

fn char_literal(character: char) -> String {
    match character {
        '\'' | '\\' => format!("Char('\\{character}')"),
        ' '..='~' => format!("Char('{character}')"),
        character => format!("Char({})", u32::from(character)),
    }
}

/// Escape the text for a string literal of the target language.
pub(crate) fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for character in text.chars() {
        match character {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            character if character.is_ascii_control() => {
                escaped.push_str(&format!("\\{:03o}", u32::from(character)));
            }
            character => escaped.push(character),
        }
    }

    escaped
}
