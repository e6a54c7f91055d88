//! The emission of expressions.

use crate::{
    block,
    types::{cpp_path, default_accessor, flat_name, namespace},
    Generator, Receiver,
};
use ast::{
    BareExpression, Binary, BinaryOperator, Call, Compare, CompareOperator, Constant, Expression,
    Subscript, UnaryOperator,
};
use diagnostics::{Diag, Result};
use hir::{Class, Function, FunctionFlags, Parameter, Type};
use span::Span;
use typer::{
    arrange_arguments, default_type, integer_literal, intersect, intersection_of, operator_method,
    resolve_call, resolve_entity, tuple_index, value_type, Argument, Builtin, Callee, Entity,
};
use utility::{Atom, QuoteExt};

impl Generator<'_, '_> {
    /// Compile an expression as a value of the given type which it has been checked against.
    pub(crate) fn emit(&mut self, expression: &Expression, type_: &Type) -> Result<String> {
        if let (Some(value), Type::Primitive(primitive)) = (integer_literal(expression), type_) {
            return self.integer(&value, *primitive, expression);
        }

        let span = expression.span;

        match &expression.bare {
            BareExpression::Name(name) => self.name(*name, expression),
            BareExpression::Constant(constant) => self.literal(constant, type_, expression),
            BareExpression::Attribute(attribute) => {
                if let Some(Entity::Variable { qualified, .. }) = resolve_entity(self.context, expression) {
                    return Ok(cpp_path(&qualified));
                }
                if let Some(Entity::Enum(enum_)) = resolve_entity(self.context, &attribute.value) {
                    return Ok(format!(
                        "{}::{}",
                        cpp_path(&enum_.qualified_name()),
                        attribute.name.bare
                    ));
                }

                let (receiver, type_) = self.receiver(&attribute.value)?;
                Ok(format!("{receiver}{}{}", self.access(&type_), attribute.name.bare))
            }
            BareExpression::Call(call) => self.call(call, type_, span),
            BareExpression::Subscript(subscript) => self.subscript(subscript),
            BareExpression::Slice(_) => Err(Diag::error()
                .message("slices are only allowed in subscripts")
                .unlabeled_span(expression)),
            BareExpression::Binary(binary) => self.binary(binary, type_),
            BareExpression::Unary(unary) => {
                let operator = match unary.operator {
                    UnaryOperator::Not => return Ok(format!("!({})", self.condition(&unary.operand)?)),
                    UnaryOperator::Minus => "-",
                    UnaryOperator::Plus => "+",
                    UnaryOperator::Invert => "~",
                };
                Ok(format!("{operator}({})", self.convert(&unary.operand, type_)?))
            }
            BareExpression::Boolean(boolean) => {
                let operator = match boolean.operator {
                    ast::BooleanOperator::And => "&&",
                    ast::BooleanOperator::Or => "||",
                };
                let left = self.condition(&boolean.left)?;
                let right = self.condition(&boolean.right)?;
                Ok(format!("({left} {operator} {right})"))
            }
            BareExpression::Compare(compare) => self.compare(compare),
            BareExpression::Conditional(_) => self.convert(expression, type_),
            BareExpression::List(_)
            | BareExpression::Set(_)
            | BareExpression::Dict(_)
            | BareExpression::Tuple(_) => match self.display(expression, type_)? {
                Some(display) => Ok(display),
                None => Err(Diag::bug()
                    .message(format!("display typed as {}", type_.quote()))
                    .unlabeled_span(expression)),
            },
            BareExpression::ListComprehension(_)
            | BareExpression::SetComprehension(_)
            | BareExpression::DictComprehension(_) => self.comprehension(expression, type_),
        }
    }

    fn name(&mut self, name: Atom, expression: &Expression) -> Result<String> {
        if name == Atom::SELF && self.context.is_local(name) {
            return Ok(self.this());
        }
        if self.context.is_local(name) {
            return Ok(name.to_string());
        }

        match resolve_entity(self.context, expression) {
            Some(Entity::Variable { qualified, .. }) => Ok(cpp_path(&qualified)),
            _ => Err(Diag::bug()
                .message(format!("unexpected name {}", name.quote()))
                .unlabeled_span(expression)),
        }
    }

    /// The shared pointer to the receiver of the method being compiled.
    pub(crate) fn this(&self) -> String {
        match (self.receiver, &self.context.class) {
            (Receiver::This, Some(class)) => format!(
                "mys::static_pointer_cast<{}>(shared_from_this())",
                cpp_path(&class.qualified_name())
            ),
            _ => "self".to_owned(),
        }
    }

    /// Compile the receiver of a member access or a method call.
    fn receiver(&mut self, expression: &Expression) -> Result<(String, Type)> {
        let is_self = expression.as_name() == Some(Atom::SELF) && self.context.is_local(Atom::SELF);

        match (is_self, self.receiver) {
            (true, Receiver::This) => {
                let type_ = value_type(self.context, expression)?;
                Ok(("this".to_owned(), type_))
            }
            _ => self.value(expression),
        }
    }

    fn access(&self, type_: &Type) -> &'static str {
        if self.is_pointer(type_) {
            "->"
        } else {
            "."
        }
    }

    fn call(&mut self, call: &Call, type_: &Type, span: Span) -> Result<String> {
        let callee = resolve_call(self.context, call, span)?;

        Ok(match callee {
            Callee::Function { path, function } => {
                let owner = flat_name(&function.module, &path);
                let arguments = self.arguments(&function, &owner, call, span)?;
                format!("{}({})", cpp_path(&path), arguments.join(", "))
            }
            Callee::Method { class, function } => {
                let (receiver, _) = self.callee_receiver(call)?;
                let owner = format!("{}_{}", class.name.bare, function.name.bare);
                let arguments = self.arguments(&function, &owner, call, span)?;
                format!("{receiver}->{}({})", function.name.bare, arguments.join(", "))
            }
            Callee::TraitMethod { trait_, function } => {
                let (receiver, _) = self.callee_receiver(call)?;
                let owner = format!("{}_{}", trait_.name.bare, function.name.bare);
                let arguments = self.arguments(&function, &owner, call, span)?;
                format!("{receiver}->{}({})", function.name.bare, arguments.join(", "))
            }
            Callee::SpecializedMethod { path, function, .. } => {
                let (receiver, _) = self.callee_receiver(call)?;
                let receiver = if receiver == "this" { self.this() } else { receiver };
                let name = flat_name(&function.module, &path);
                let mut arguments = vec![receiver];
                arguments.extend(self.arguments(&function, &name, call, span)?);
                format!("{}::{name}({})", namespace(&function.module), arguments.join(", "))
            }
            Callee::StaticFunction { class, function } => {
                let owner = format!("{}_{}", class.name.bare, function.name.bare);
                let arguments = self.arguments(&function, &owner, call, span)?;
                format!(
                    "{}::{}({})",
                    cpp_path(&class.qualified_name()),
                    function.name.bare,
                    arguments.join(", ")
                )
            }
            Callee::Constructor { class, init } => {
                let arguments = match init {
                    Some(init) => {
                        let owner = format!("{}_{}", class.name.bare, Atom::INIT);
                        self.arguments(&init, &owner, call, span)?
                    }
                    None => {
                        let init = synthesized_constructor(&class);
                        self.arguments(&init, "", call, span)?
                    }
                };
                format!(
                    "mys::make_shared<{}>({})",
                    cpp_path(&class.qualified_name()),
                    arguments.join(", ")
                )
            }
            Callee::BuiltinClass(name) => {
                let message = match call.arguments.as_slice() {
                    [] => "String(\"\")".to_owned(),
                    [message] => self.convert(message, &Type::String)?,
                    _ => {
                        return Err(Diag::error()
                            .message(format!("{} takes at most one argument", name.quote()))
                            .unlabeled_span(span))
                    }
                };
                format!("mys::make_shared<mys::{name}>({message})")
            }
            Callee::Builtin(builtin) => self.builtin(builtin, call, type_, span)?,
            Callee::BuiltinMethod { name, signature } => {
                let (receiver, receiver_type) = self.callee_receiver(call)?;
                let given = call.arguments.len();
                if !call.keywords.is_empty() || given < signature.required || given > signature.parameters.len() {
                    return Err(Diag::error()
                        .message(format!(
                            "{} takes {} {} but {given} were given",
                            name.quote(),
                            signature.parameters.len(),
                            utility::pluralize!(signature.parameters.len(), "argument"),
                        ))
                        .unlabeled_span(span));
                }

                let mut arguments = Vec::new();
                for (argument, parameter) in call.arguments.iter().zip(&signature.parameters) {
                    arguments.push(self.convert(argument, parameter)?);
                }
                format!(
                    "{receiver}{}{name}({})",
                    self.access(&receiver_type),
                    arguments.join(", ")
                )
            }
            Callee::Conversion(target) => {
                let [argument] = call.arguments.as_slice() else {
                    return Err(Diag::error()
                        .message(format!("conversion to {} takes exactly one argument", target.quote()))
                        .unlabeled_span(span));
                };
                let actual = value_type(self.context, argument)?;
                if actual == Type::String {
                    return Err(Diag::error()
                        .message(format!("cannot convert 'string' to {}", target.quote()))
                        .unlabeled_span(argument));
                }

                // literals are range checked against the target type
                let source = intersection_of(&actual, &target).unwrap_or_else(|| default_type(&actual));
                let value = self.convert(argument, &source)?;
                format!("static_cast<{}>({value})", self.cpp_type(&target))
            }
        })
    }

    fn callee_receiver(&mut self, call: &Call) -> Result<(String, Type)> {
        match &call.function.bare {
            BareExpression::Attribute(attribute) => self.receiver(&attribute.value),
            _ => Err(Diag::bug()
                .message("method called without a receiver")
                .unlabeled_span(&call.function)),
        }
    }

    /// Compile the arguments of a call in the order of the parameters of the function.
    ///
    /// Parameters not given an argument are passed the value of their default accessor.
    fn arguments(&mut self, function: &Function, owner: &str, call: &Call, span: Span) -> Result<Vec<String>> {
        let arranged = arrange_arguments(function, call, span)?;

        let mut arguments = Vec::new();
        for (parameter, argument) in function.parameters.iter().zip(arranged) {
            let type_ = self.concrete(&parameter.type_, span)?;
            arguments.push(match argument {
                Argument::Given(expression) => self.convert(expression, &type_)?,
                Argument::Default => format!(
                    "{}::{}()",
                    namespace(&function.module),
                    default_accessor(owner, function, parameter)
                ),
            });
        }

        Ok(arguments)
    }

    fn builtin(&mut self, builtin: Builtin, call: &Call, type_: &Type, span: Span) -> Result<String> {
        let arguments = call.arguments.as_slice();

        Ok(match (builtin, arguments) {
            (Builtin::Print, _) => {
                let mut text = "std::cout".to_owned();
                for (position, argument) in arguments.iter().enumerate() {
                    if position > 0 {
                        text += " << \" \"";
                    }
                    text += &format!(" << {}", self.expression(argument)?);
                }

                let mut end = "\"\\n\"".to_owned();
                let mut flush = false;
                for keyword in &call.keywords {
                    if keyword.name.bare == "end" {
                        end = self.convert(&keyword.value, &Type::String)?;
                    } else {
                        flush = match keyword.value.bare {
                            BareExpression::Constant(Constant::Bool(flush)) => flush,
                            _ => {
                                return Err(Diag::error()
                                    .message("'flush' must be 'True' or 'False'")
                                    .unlabeled_span(&keyword.value))
                            }
                        };
                    }
                }

                text += &format!(" << {end}");
                if flush {
                    text += " << std::flush";
                }
                text
            }
            (Builtin::Len, [argument]) => {
                let (value, argument_type) = self.value(argument)?;
                format!("{value}{}__len__()", self.access(&argument_type))
            }
            (Builtin::Str, [argument]) => format!("String({})", self.expression(argument)?),
            (Builtin::Abs, [argument]) => format!("std::abs({})", self.convert(argument, type_)?),
            (Builtin::Min | Builtin::Max, [argument]) => {
                format!("mys::{}({})", builtin.name(), self.expression(argument)?)
            }
            (Builtin::Min | Builtin::Max, arguments) if arguments.len() > 1 => {
                let mut values = Vec::new();
                for argument in arguments {
                    values.push(self.convert(argument, type_)?);
                }
                format!("std::{}({{{}}})", builtin.name(), values.join(", "))
            }
            (builtin, _) => {
                return Err(Diag::error()
                    .message(format!("unexpected arguments to {}", builtin.name().quote()))
                    .unlabeled_span(span))
            }
        })
    }

    fn subscript(&mut self, subscript: &Subscript) -> Result<String> {
        let (value, container) = self.value(&subscript.value)?;
        let index = &subscript.index;
        let access = self.access(&container);

        Ok(match (&container, &index.bare) {
            (Type::Tuple(elements), _) => {
                let position = tuple_index(index, elements.len())?;
                format!("std::get<{position}>(*{value})")
            }
            (_, BareExpression::Slice(slice)) => {
                let mut bounds = Vec::new();
                for bound in [&slice.lower, &slice.upper, &slice.step] {
                    bounds.push(match bound {
                        Some(bound) => format!("mys::optional<i64>({})", self.convert(bound, &Type::I64)?),
                        None => "mys::optional<i64>()".to_owned(),
                    });
                }
                format!("{value}{access}slice({})", bounds.join(", "))
            }
            (Type::Dict(key, _), _) => {
                let key = self.convert(index, key)?;
                format!("{value}->get({key})")
            }
            _ => {
                let index = self.convert(index, &Type::I64)?;
                format!("{value}{access}get({index})")
            }
        })
    }

    fn binary(&mut self, binary: &Binary, type_: &Type) -> Result<String> {
        use BinaryOperator::*;

        let left_type = default_type(&value_type(self.context, &binary.left)?);
        let operator = binary.operator;

        if let Type::Named(name) = &left_type {
            let left = self.convert(&binary.left, &left_type)?;
            let parameter = match self.context.class(name) {
                Some(class) => operator_method(self.context, &class, binary, binary.right.span)?
                    .parameters
                    .first()
                    .map(|parameter| parameter.type_.clone()),
                None => None,
            };
            let right = match parameter {
                Some(type_) => {
                    let type_ = self.concrete(&type_, binary.right.span)?;
                    self.convert(&binary.right, &type_)?
                }
                None => self.expression(&binary.right)?,
            };
            return Ok(format!("{left}->{}({right})", operator.method_name()));
        }

        // repetition and shifts do not require both operands to be of the same type
        let repetition = matches!(left_type, Type::String | Type::List(_)) && operator == Multiply;
        if repetition || matches!(operator, LeftShift | RightShift) {
            let left = self.convert(&binary.left, type_)?;
            let right = self.expression(&binary.right)?;
            return Ok(format!("({left} {} {right})", operator.symbol()));
        }

        let left = self.convert(&binary.left, type_)?;
        let right = self.convert(&binary.right, type_)?;
        let is_float = type_.is_float();

        Ok(match operator {
            Power if is_float => format!("std::pow({left}, {right})"),
            Power => format!("mys::ipow({left}, {right})"),
            Modulo if is_float => format!("std::fmod({left}, {right})"),
            FloorDivide if is_float => format!("std::floor({left} / {right})"),
            FloorDivide => format!("({left} / {right})"),
            operator => format!("({left} {} {right})", operator.symbol()),
        })
    }

    fn compare(&mut self, compare: &Compare) -> Result<String> {
        let mut left = &compare.left;
        let mut comparisons = Vec::new();

        for (operator, right) in &compare.comparisons {
            comparisons.push(self.comparison(left, *operator, right)?);
            left = right;
        }

        Ok(match comparisons.as_slice() {
            [comparison] => comparison.clone(),
            comparisons => format!("({})", comparisons.join(" && ")),
        })
    }

    fn comparison(&mut self, left: &Expression, operator: CompareOperator, right: &Expression) -> Result<String> {
        use CompareOperator::*;

        let span = left.span.merge(right.span);
        let is_none = |expression: &Expression| {
            matches!(expression.bare, BareExpression::Constant(Constant::None))
        };

        match operator {
            In | NotIn => {
                let (container, container_type) = self.value(right)?;
                let element = match &container_type {
                    Type::List(element) | Type::Set(element) | Type::Dict(element, _) => (**element).clone(),
                    Type::String | Type::Bytes => default_type(&value_type(self.context, left)?),
                    type_ => {
                        return Err(Diag::error()
                            .message(format!("{} does not support 'in'", type_.quote()))
                            .unlabeled_span(right))
                    }
                };
                let value = self.convert(left, &element)?;
                let test = format!("{container}{}__contains__({value})", self.access(&container_type));
                return Ok(if operator == NotIn { format!("!{test}") } else { test });
            }
            Is | IsNot | Equal | NotEqual if is_none(left) || is_none(right) => {
                let value = if is_none(right) { left } else { right };
                let (code, type_) = self.value(value)?;
                let test = match &type_ {
                    Type::Optional(inner) if !self.is_nullable(inner) => format!("!{code}.has_value()"),
                    type_ if self.is_nullable(type_) || matches!(type_, Type::Optional(_)) => {
                        format!("({code} == nullptr)")
                    }
                    type_ => {
                        return Err(Diag::error()
                            .message(format!("{} is never 'None'", type_.quote()))
                            .unlabeled_span(value))
                    }
                };
                return Ok(if matches!(operator, IsNot | NotEqual) { format!("!{test}") } else { test });
            }
            _ => {}
        }

        let left_type = value_type(self.context, left)?;
        let right_type = value_type(self.context, right)?;
        let type_ = default_type(&intersect(&left_type, &right_type, span)?);

        let mut left_code = self.convert(left, &type_)?;
        let mut right_code = self.convert(right, &type_)?;

        if matches!(operator, Equal | NotEqual) && matches!(type_, Type::String | Type::Bytes | Type::Tuple(_)) {
            if is_constant(left) {
                left_code = self.context.constant(&type_, left_code);
            }
            if is_constant(right) {
                right_code = self.context.constant(&type_, right_code);
            }
        }

        let symbol = match operator {
            Is => "==",
            IsNot => "!=",
            operator => operator.symbol(),
        };
        Ok(format!("({left_code} {symbol} {right_code})"))
    }

    /// Lift a comprehension into a function taking the local variables it captures.
    fn comprehension(&mut self, expression: &Expression, type_: &Type) -> Result<String> {
        let name = self.context.unique("comprehension");
        let names = ast::visit::names_in_expression(expression);
        let captured: Vec<(Atom, Type)> = self
            .context
            .locals()
            .into_iter()
            .filter(|(local, _)| names.contains(local))
            .collect();

        let mut parameters = Vec::new();
        let mut arguments = Vec::new();
        for (local, local_type) in &captured {
            parameters.push(format!("{} {local}", self.cpp_type(local_type)));
            arguments.push(if *local == Atom::SELF { self.this() } else { local.to_string() });
        }

        let receiver = std::mem::replace(&mut self.receiver, Receiver::Parameter);
        let body = self.comprehension_body(expression, type_);
        self.receiver = receiver;

        self.lifted.push(format!(
            "\nstatic {} {name}({})\n{}\n",
            self.cpp_type(type_),
            parameters.join(", "),
            block(&body?)
        ));
        Ok(format!("{name}({})", arguments.join(", ")))
    }

    fn comprehension_body(&mut self, expression: &Expression, type_: &Type) -> Result<String> {
        let result = self.context.unique("result");
        let (generator, element) = match (&expression.bare, type_) {
            (BareExpression::ListComprehension(comprehension), Type::List(element))
            | (BareExpression::SetComprehension(comprehension), Type::Set(element)) => {
                (&comprehension.generator, Some((&comprehension.element, &**element)))
            }
            (BareExpression::DictComprehension(comprehension), Type::Dict(..)) => (&comprehension.generator, None),
            _ => {
                return Err(Diag::bug()
                    .message(format!("comprehension typed as {}", type_.quote()))
                    .unlabeled_span(expression))
            }
        };

        let loop_ = self.iterate(&generator.target, &generator.iterable, |this| {
            let mut body = String::new();
            for condition in &generator.conditions {
                body += &format!("if (!({})) {{\n    continue;\n}}\n", this.condition(condition)?);
            }

            match (&expression.bare, element, type_) {
                (BareExpression::ListComprehension(_), Some((element, element_type)), _) => {
                    body += &format!("{result}->append({});\n", this.convert(element, element_type)?);
                }
                (BareExpression::SetComprehension(_), Some((element, element_type)), _) => {
                    body += &format!("{result}->add({});\n", this.convert(element, element_type)?);
                }
                (BareExpression::DictComprehension(comprehension), _, Type::Dict(key, value)) => {
                    let key = this.convert(&comprehension.key, key)?;
                    let value = this.convert(&comprehension.value, value)?;
                    body += &format!("(*{result})[{key}] = {value};\n");
                }
                _ => {}
            }
            Ok(body)
        })?;

        Ok(format!(
            "{} {result} = mys::make_shared<{}>();\n{loop_}return {result};\n",
            self.cpp_type(type_),
            self.object_type(type_)
        ))
    }
}

/// Whether the expression is a literal that can be hoisted into a constant.
fn is_constant(expression: &Expression) -> bool {
    match &expression.bare {
        BareExpression::Constant(Constant::String(_) | Constant::Bytes(_)) => true,
        BareExpression::Tuple(elements) => elements
            .iter()
            .all(|element| matches!(element.bare, BareExpression::Constant(_))),
        _ => false,
    }
}

/// The constructor of a class without `__init__` which takes the public members in declaration
/// order.
fn synthesized_constructor(class: &Class) -> Function {
    Function {
        name: class.name,
        module: class.module.clone(),
        generic_types: Vec::new(),
        raises: Vec::new(),
        flags: FunctionFlags::empty(),
        parameters: class
            .public_members()
            .map(|member| Parameter {
                name: member.name,
                type_: member.type_.clone(),
                default: None,
            })
            .collect(),
        returns: None,
        node: ast::Function {
            name: class.name,
            decorators: Vec::new(),
            parameters: Vec::new(),
            returns: None,
            body: Vec::new(),
        },
    }
}
