//! The emission of functions, classes and the module initializer.

use crate::{
    block,
    types::{cpp_path, default_accessor, flat_name},
    Generator, Options, Parts, Receiver,
};
use diagnostics::{Diag, Result};
use hir::{Class, Definitions, Function, Type};
use joinery::JoinableIterator;
use std::rc::Rc;
use utility::{Atom, QuoteExt};

/// What a function is compiled as.
#[derive(Clone, Copy)]
enum Kind<'c> {
    Free,
    Method(&'c Rc<Class>),
    Static(&'c Rc<Class>),
    /// A generic method specialized into a free function taking the receiver as its first
    /// parameter.
    SpecializedMethod(&'c Rc<Class>),
}

impl Generator<'_, '_> {
    pub(crate) fn module(&mut self, definitions: &Definitions, options: Options) -> Result<Parts> {
        let mut parts = Parts::default();

        for enum_ in definitions.enums.values() {
            parts.declarations += &self.enum_definition(enum_);
        }

        for trait_ in definitions.traits.values() {
            parts.declarations += &format!("class {};\n", trait_.name.bare);
            parts.traits += &self.trait_definition(trait_)?;
            for function in trait_.methods.values().flatten() {
                let owner = format!("{}_{}", trait_.name.bare, function.name.bare);
                self.default_accessors(&owner, function, false, &mut parts)?;
            }
        }

        for class in definitions.classes.values() {
            if !class.is_generic() {
                self.class(class, false, &mut parts)?;
            }
        }

        let mut initialization = String::new();
        for variable in definitions.variables.values() {
            let type_ = self.concrete(&variable.type_, variable.name.span)?;
            let cpp_type = self.cpp_type(&type_);
            let value = match &variable.value {
                Some(value) => self.convert(value, &type_)?,
                None => self.zero_value(&type_),
            };
            parts.prototypes += &format!("extern {cpp_type} {};\n", variable.name.bare);
            parts.definitions += &format!("{cpp_type} {};\n", variable.name.bare);
            initialization += &format!("{} = {value};\n", variable.name.bare);
        }

        for function in definitions.functions.values().flatten() {
            if !function.is_generic() {
                let path = hir::qualify(&definitions.module, function.name.bare);
                self.function(&path, function, Kind::Free, false, &mut parts)?;
            }
        }

        for test in definitions.function_tests() {
            parts.definitions += &format!(
                "static mys::Test __test_{name}(\"{}.{name}\", {name});\n",
                definitions.module,
                name = test.name.bare,
            );
        }

        parts.prototypes += "void __module_init();\n";
        parts.definitions += &self.take_lifted();
        parts.definitions += &format!("\nvoid __module_init()\n{}\n", block(&initialization));

        if options.has_main {
            self.entry(definitions, &mut parts)?;
        }

        parts.definitions.insert_str(0, &self.constants());
        Ok(parts)
    }

    /// Emit the hook the application calls on start.
    fn entry(&mut self, definitions: &Definitions, parts: &mut Parts) -> Result {
        let Some(main) = definitions
            .functions
            .get(Atom::MAIN)
            .and_then(|overloads| overloads.first())
        else {
            return Err(Diag::error().message("main() is not defined"));
        };

        let arguments = match main.parameters.as_slice() {
            [] => "",
            [parameter] if parameter.type_ == Type::list(Type::String) => {
                "mys::create_args(argc, argv)"
            }
            _ => {
                return Err(Diag::error()
                    .message("main() takes no parameters or the command line arguments as '[string]'")
                    .unlabeled_span(main.name))
            }
        };

        parts.prototypes += "int __application_main(int argc, const char* argv[]);\n";
        parts.definitions += &format!(
            "\nint __application_main(int argc, const char* argv[])\n{{\n    \
             __module_init();\n    main({arguments});\n    return 0;\n}}\n"
        );
        Ok(())
    }

    fn enum_definition(&self, enum_: &hir::Enum) -> String {
        let members = enum_
            .members
            .iter()
            .map(|(name, value)| format!("    {} = {value},\n", name.bare))
            .collect::<String>();

        format!(
            "enum class {} : {} {{\n{members}}};\n\n",
            enum_.name.bare,
            crate::types::primitive_type(enum_.type_)
        )
    }

    pub(crate) fn specialized_function(&mut self, path: &str, function: &Rc<Function>, parts: &mut Parts) -> Result {
        if function.is_method() {
            let class_path = hir::module_of(path).unwrap_or_default();
            let Some(class) = self.context.class(class_path) else {
                return Err(Diag::bug().message(format!(
                    "class {} of specialized method is not registered",
                    class_path.quote()
                )));
            };
            return self.function(path, function, Kind::SpecializedMethod(&class), true, parts);
        }

        self.function(path, function, Kind::Free, true, parts)
    }

    pub(crate) fn specialized_class(&mut self, class: &Rc<Class>, parts: &mut Parts) -> Result {
        self.class(class, true, parts)
    }

    /// Emit the prototype and the definition of a free function, a method or a static function.
    fn function(
        &mut self,
        path: &str,
        function: &Rc<Function>,
        kind: Kind<'_>,
        specialized: bool,
        parts: &mut Parts,
    ) -> Result {
        let inline = if specialized { "inline " } else { "" };

        let (prototype, definition) = match kind {
            Kind::Free => {
                let name = flat_name(&function.module, path);
                let signature = self.signature(function, &name, None)?;
                self.default_accessors(&name, function, specialized, parts)?;
                parts.prototypes += &format!("{signature};\n");
                (String::new(), signature)
            }
            Kind::SpecializedMethod(class) => {
                let name = flat_name(&function.module, path);
                let signature = self.signature(function, &name, Some(class))?;
                self.default_accessors(&name, function, specialized, parts)?;
                parts.prototypes += &format!("{signature};\n");
                (String::new(), signature)
            }
            Kind::Method(class) | Kind::Static(class) => {
                let owner = format!("{}_{}", class.name.bare, function.name.bare);
                self.default_accessors(&owner, function, specialized, parts)?;
                let prototype = self.signature(function, function.name.bare.to_str(), None)?;
                let qualified = format!("{}::{}", class.name.bare, function.name.bare);
                let definition = self.signature(function, &qualified, None)?;
                let prefix = if matches!(kind, Kind::Static(_)) { "static" } else { "virtual" };
                (format!("    {prefix} {prototype};\n"), definition)
            }
        };

        let body = match kind {
            Kind::Free => self.function_body(function, None, Receiver::This)?,
            Kind::Static(class) => self.function_body(function, Some(class), Receiver::This)?,
            Kind::Method(class) => self.function_body(function, Some(class), Receiver::This)?,
            Kind::SpecializedMethod(class) => {
                self.function_body(function, Some(class), Receiver::Parameter)?
            }
        };

        parts.definitions += &self.take_lifted();
        parts.definitions += &format!("\n{inline}{definition}\n{body}\n");
        parts.classes += &prototype;
        Ok(())
    }

    /// The signature of a function under the given name.
    fn signature(&mut self, function: &Function, name: &str, receiver: Option<&Rc<Class>>) -> Result<String> {
        let returns = match &function.returns {
            Some(type_) => {
                let type_ = self.concrete(type_, function.span())?;
                self.cpp_type(&type_)
            }
            None => "void".to_owned(),
        };
        let parameters = self.parameters(function, receiver)?;

        Ok(format!("{returns} {name}({parameters})"))
    }

    fn parameters(&mut self, function: &Function, receiver: Option<&Rc<Class>>) -> Result<String> {
        let mut parameters = Vec::new();
        if let Some(class) = receiver {
            parameters.push(format!(
                "const mys::shared_ptr<{}>& self",
                cpp_path(&class.qualified_name())
            ));
        }
        for parameter in &function.parameters {
            let type_ = self.concrete(&parameter.type_, parameter.name.span)?;
            parameters.push(format!("{} {}", self.cpp_type(&type_), parameter.name.bare));
        }

        Ok(parameters.iter().join_with(", ").to_string())
    }

    fn function_body(&mut self, function: &Function, class: Option<&Rc<Class>>, receiver: Receiver) -> Result<String> {
        Ok(block(&self.function_statements(function, class, receiver)?))
    }

    /// Compile the body of a function with its parameters in scope.
    fn function_statements(
        &mut self,
        function: &Function,
        class: Option<&Rc<Class>>,
        receiver: Receiver,
    ) -> Result<String> {
        let returns = match &function.returns {
            Some(type_) => Some(self.concrete(type_, function.span())?),
            None => None,
        };

        let class = std::mem::replace(&mut self.context.class, class.cloned());
        let returns = std::mem::replace(&mut self.context.returns, returns);
        let receiver = std::mem::replace(&mut self.receiver, receiver);
        self.context.push_scope();

        let body = self.parameters_and_body(function);

        self.context.pop_scope();
        self.receiver = receiver;
        self.context.returns = returns;
        self.context.class = class;

        body
    }

    fn parameters_and_body(&mut self, function: &Function) -> Result<String> {
        if let (true, Some(class)) = (function.is_method(), &self.context.class) {
            let type_ = Type::Named(class.qualified_name());
            self.context.define_local(Atom::SELF, type_);
        }
        for parameter in &function.parameters {
            let type_ = self.concrete(&parameter.type_, parameter.name.span)?;
            self.context.define_local(parameter.name.bare, type_);
        }

        self.body(function.body())
    }

    /// Emit the functions returning the default values of the parameters of a function.
    fn default_accessors(&mut self, owner: &str, function: &Function, specialized: bool, parts: &mut Parts) -> Result {
        let inline = if specialized { "inline " } else { "" };

        for parameter in &function.parameters {
            let Some(default) = &parameter.default else {
                continue;
            };

            let type_ = self.concrete(&parameter.type_, parameter.name.span)?;
            let cpp_type = self.cpp_type(&type_);
            let name = default_accessor(owner, function, parameter);
            let value = self.convert(default, &type_)?;

            parts.prototypes += &format!("{cpp_type} {name}();\n");
            parts.definitions += &self.take_lifted();
            parts.definitions += &format!("\n{inline}{cpp_type} {name}()\n{{\n    return {value};\n}}\n");
        }

        Ok(())
    }

    /// Emit the declaration, the body and the definitions of the methods of a class.
    fn class(&mut self, class: &Rc<Class>, specialized: bool, parts: &mut Parts) -> Result {
        let name = class.name.bare;
        let inline = if specialized { "inline " } else { "" };
        let path = cpp_path(&class.qualified_name());

        parts.declarations += &format!("class {name};\n");
        if class.is_error() {
            parts.declarations += &format!("class __{name};\n");
        }

        let mut bases = vec!["public virtual mys::Object".to_owned()];
        bases.extend(
            class
                .implements
                .iter()
                .map(|trait_| format!("public {}", cpp_path(&trait_.bare))),
        );

        let mut body = String::new();
        let mut members = Vec::new();
        for member in class.members.values() {
            let type_ = self.concrete(&member.type_, member.name.span)?;
            body += &format!("    {} {};\n", self.cpp_type(&type_), member.name.bare);
            members.push((member.name.bare, type_));
        }

        // the prototypes of the methods are appended to the class body by `function`
        let mut methods = Parts::default();
        self.constructors(class, &members, inline, &mut methods)?;

        for function in class.methods.values().flatten() {
            let name = function.name.bare;
            if function.is_generic() || name == Atom::INIT || name == Atom::DEL {
                continue;
            }
            let path = format!("{}.{name}", class.qualified_name());
            self.function(&path, function, Kind::Method(class), specialized, &mut methods)?;
        }
        for function in class.static_functions.values().flatten() {
            if !function.is_generic() {
                let path = format!("{}.{}", class.qualified_name(), function.name.bare);
                self.function(&path, function, Kind::Static(class), specialized, &mut methods)?;
            }
        }

        body += &methods.classes;
        body += "    void __format__(std::ostream& os) const override;\n";
        methods.definitions += &self.format_method(class, &members, inline);

        if class.method(Atom::STR).is_none() {
            body += "    String __str__();\n";
            methods.definitions += &format!(
                "\n{inline}String {name}::__str__()\n{{\n    std::stringstream ss;\n    \
                 __format__(ss);\n    return String(ss.str().c_str());\n}}\n"
            );
        }

        if class.is_error() {
            body += "    [[noreturn]] void __throw();\n";
            methods.definitions += &format!(
                "\n{inline}void {name}::__throw()\n{{\n    \
                 throw __{name}(mys::static_pointer_cast<{name}>(shared_from_this()));\n}}\n"
            );
        }

        let mut declaration = format!(
            "class {name} : {} {{\npublic:\n{body}}};\n\n",
            bases.join(", ")
        );
        if class.is_error() {
            declaration += &format!(
                "class __{name} : public mys::__Error {{\npublic:\n    \
                 mys::shared_ptr<{name}> m_error;\n    \
                 __{name}(const mys::shared_ptr<{name}>& error) : mys::__Error(error), m_error(error) {{}}\n}};\n\n"
            );
        }
        if specialized {
            let guard = format!("MYS_{}", path.replace("::", "_"));
            declaration = format!("#ifndef {guard}\n#define {guard}\n\n{declaration}#endif\n\n");
        }

        parts.classes += &declaration;
        parts.prototypes += &methods.prototypes;
        parts.definitions += &methods.definitions;
        Ok(())
    }

    /// Emit the constructors and the destructor of a class.
    ///
    /// A class without `__init__` gets a constructor taking its public members in declaration
    /// order. Private members are initialized with zero values.
    fn constructors(
        &mut self,
        class: &Rc<Class>,
        members: &[(Atom, Type)],
        inline: &str,
        parts: &mut Parts,
    ) -> Result {
        let name = class.name.bare;
        let zero_members: String = members
            .iter()
            .map(|(member, type_)| format!("this->{member} = {};\n", self.zero_value(type_)))
            .collect();

        match class.method(Atom::INIT) {
            Some(overloads) => {
                for init in overloads {
                    let owner = format!("{name}_{}", Atom::INIT);
                    self.default_accessors(&owner, init, !inline.is_empty(), parts)?;
                    let parameters = self.parameters(init, None)?;
                    let statements = self.function_statements(init, Some(class), Receiver::This)?;

                    parts.classes += &format!("    {name}({parameters});\n");
                    parts.definitions += &self.take_lifted();
                    parts.definitions += &format!(
                        "\n{inline}{name}::{name}({parameters})\n{}\n",
                        block(&(zero_members.clone() + &statements)),
                    );
                }
            }
            None => {
                let mut parameters = Vec::new();
                let mut assignments = String::new();
                for (member, type_) in members {
                    if member.to_str().starts_with('_') {
                        assignments += &format!("this->{member} = {};\n", self.zero_value(type_));
                    } else {
                        parameters.push(format!("{} {member}", self.cpp_type(type_)));
                        assignments += &format!("this->{member} = {member};\n");
                    }
                }
                let parameters = parameters.join(", ");

                parts.classes += &format!("    {name}({parameters});\n");
                parts.definitions += &format!(
                    "\n{inline}{name}::{name}({parameters})\n{}\n",
                    block(&assignments)
                );
            }
        }

        let destructor = match class.method(Atom::DEL).and_then(|overloads| overloads.first()) {
            Some(function) => self.function_body(function, Some(class), Receiver::This)?,
            None => "{\n}".to_owned(),
        };
        parts.classes += &format!("    virtual ~{name}();\n");
        parts.definitions += &self.take_lifted();
        parts.definitions += &format!("\n{inline}{name}::~{name}()\n{destructor}\n");
        Ok(())
    }

    /// The definition of the method writing `Name(member=value, ...)` to a stream.
    fn format_method(&self, class: &Class, members: &[(Atom, Type)], inline: &str) -> String {
        let name = class.name.bare;

        let body = if class.method(Atom::STR).is_some() {
            format!("os << const_cast<{name}*>(this)->__str__();\n")
        } else {
            let members = members
                .iter()
                .map(|(member, _)| format!("os << \"{member}=\" << mys::repr({member});\n"))
                .join_with("os << \", \";\n");
            format!("os << \"{name}(\";\n{members}os << \")\";\n")
        };

        format!(
            "\n{inline}void {name}::__format__(std::ostream& os) const\n{}\n",
            block(&body)
        )
    }

    fn trait_definition(&mut self, trait_: &hir::Trait) -> Result<String> {
        let mut body = String::new();

        for function in trait_.methods.values().flatten() {
            if function.is_generic() {
                continue;
            }
            let signature = self.signature(function, function.name.bare.to_str(), None)?;
            body += &format!("    virtual {signature} = 0;\n");
        }

        Ok(format!(
            "class {} : public virtual mys::Object {{\npublic:\n{body}}};\n\n",
            trait_.name.bare
        ))
    }

    /// Make the type concrete, specializing generic classes it instantiates.
    pub(crate) fn concrete(&mut self, type_: &Type, span: span::Span) -> Result<Type> {
        specializer::concretize(self.context, type_, span)
    }
}
