use super::*;
use crate::language::{parser::parse_source_file, span::FileId};
use indoc::indoc;
use std::path::PathBuf;

fn parse(files: &[(&str, &str)]) -> Program {
    let files = files
        .iter()
        .enumerate()
        .map(|(index, (module, source))| {
            parse_source_file(
                FileId(index as u32),
                QualifiedName::new(module.split('.')),
                PathBuf::from(format!("{module}.hds")),
                source,
            )
            .expect("parse")
        })
        .collect();
    Program { files }
}

fn diagnostics(source: &str) -> Vec<DiagnosticKind> {
    let program = parse(&[("main", source)]);
    check_program(&program, &CheckOptions::default())
        .expect("internal error")
        .diagnostics
        .into_iter()
        .map(|diagnostic| diagnostic.kind)
        .collect()
}

fn checker(program: &Program) -> Checker<'_, ScopeResolver<'_>, Vec<Diagnostic>> {
    let mut checker = Checker::new(ScopeResolver::new(program), Vec::new());
    for file in &program.files {
        for declaration in &file.declarations {
            checker.check_declaration(declaration).expect("internal error");
        }
    }
    checker
}

fn function<'p>(program: &'p Program, name: &str) -> &'p FunctionDef {
    program.files[0]
        .declarations
        .iter()
        .find_map(|declaration| match declaration {
            Declaration::FunctionDef(def) if def.signature.name.name == name => Some(def),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no function `{name}`"))
}

fn val<'p>(def: &'p FunctionDef, name: &str) -> &'p ValStatement {
    def.body
        .members
        .iter()
        .find_map(|member| match member {
            BlockMember::Statement(Statement {
                kind: StatementKind::Val(val),
                ..
            }) if val.binder.name == name => Some(val),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no val `{name}`"))
}

fn expression(def: &FunctionDef, index: usize) -> &Expression {
    match &def.body.members[index] {
        BlockMember::Expression(expression) => expression,
        other => panic!("expected expression, got {other:?}"),
    }
}

const ID: &str = "def id[T](x: T): T { return x; }\n";

#[test]
fn generic_call_infers_type_argument() {
    let source = format!("{ID}def main(): Void {{ val a = id(42); }}");
    let program = parse(&[("main", &source)]);
    let mut checker = checker(&program);
    assert_eq!(checker.reporter(), &Vec::<Diagnostic>::new());

    let a = val(function(&program, "main"), "a");
    assert_eq!(checker.type_of_binder(&a.binder).expect("type"), Type::CInt);
    assert_eq!(checker.type_args(a.rhs.location), Some(&[Type::CInt][..]));
    let ExpressionKind::Call { callee, .. } = &a.rhs.kind else {
        panic!("expected call");
    };
    assert_eq!(checker.type_args(callee.location), Some(&[Type::CInt][..]));
}

#[test]
fn explicit_type_argument_is_checked_against_arguments() {
    let source = format!("{ID}def main(): Void {{ val a = id[Bool](42); }}");
    assert_eq!(
        diagnostics(&source),
        vec![DiagnosticKind::TypeNotAssignable {
            source_type: Type::CInt,
            destination: Type::Bool,
        }]
    );
}

#[test]
fn argument_count_mismatches_report_required_count() {
    let program = parse(&[(
        "main",
        indoc! {"
            def add(a: CInt, b: CInt): CInt { return a + b; }
            def main(): Void {
                add(1);
                add(1, 2, true);
            }
        "},
    )]);
    let mut checker = checker(&program);
    let kinds: Vec<_> = checker.reporter().iter().map(|d| d.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::MissingArgs { required: 2 },
            DiagnosticKind::TooManyArgs { required: 2 },
        ]
    );

    let ExpressionKind::Call { args, .. } = &expression(function(&program, "main"), 1).kind else {
        panic!("expected call");
    };
    assert_eq!(checker.type_of_expression(&args[2]).expect("type"), Type::Bool);
}

#[test]
fn struct_field_mutability_follows_field_and_pointer() {
    assert_eq!(
        diagnostics(indoc! {"
            struct P { val mut x: CInt; val y: CInt; }
            def set(p: *mut P, q: *P): Void {
                p.x = 1;
                *p.x = 2;
                q.x = 3;
                *q.x = 4;
                p.y = 5;
            }
        "}),
        vec![
            DiagnosticKind::StructFieldNotMutable,
            DiagnosticKind::ValNotMutable,
            DiagnosticKind::StructFieldNotMutable,
        ]
    );
}

#[test]
fn struct_value_fields_use_declared_mutability() {
    assert_eq!(
        diagnostics(indoc! {"
            struct P { val mut x: CInt; val y: CInt; }
            def main(): Void {
                val s = P(1, 2);
                s.x = 3;
                s.y = 4;
            }
        "}),
        vec![DiagnosticKind::StructFieldNotMutable]
    );
}

#[test]
fn field_access_through_pointer_yields_field_pointer() {
    let program = parse(&[(
        "main",
        indoc! {"
            struct P { val mut x: CInt; }
            def get(p: *mut P): Void {
                val a = p.x;
                val b = *p.x;
            }
        "},
    )]);
    let mut checker = checker(&program);
    let get = function(&program, "get");
    let a = val(get, "a");
    assert_eq!(
        checker.type_of_binder(&a.binder).expect("type"),
        Type::ptr(Type::CInt, true)
    );
    let b = val(get, "b");
    assert_eq!(checker.type_of_binder(&b.binder).expect("type"), Type::CInt);
    let field = checker
        .property_binding(&a.rhs)
        .and_then(PropertyBinding::field)
        .expect("field");
    assert_eq!(field.binder.name, "x");
}

#[test]
fn generic_struct_fields_are_substituted() {
    let program = parse(&[(
        "main",
        indoc! {"
            struct Box[T] { val value: T; }
            def main(): Void {
                val b = Box(true);
                val v = b.value;
                val n: *mut Box[CInt] = new Box[CInt](1);
            }
        "},
    )]);
    let mut checker = checker(&program);
    assert!(checker.reporter().is_empty(), "{:?}", checker.reporter());
    let v = val(function(&program, "main"), "v");
    assert_eq!(checker.type_of_binder(&v.binder).expect("type"), Type::Bool);
}

#[test]
fn new_requires_a_struct() {
    assert_eq!(
        diagnostics(indoc! {"
            enum Color { Red; }
            def main(): Void { new Color(); }
        "}),
        vec![DiagnosticKind::InvalidNewExpression]
    );
}

const COLOR: &str = "enum Color { Red; Green; Blue; }\n";

#[test]
fn match_missing_a_case_is_not_exhaustive() {
    let source = format!("{COLOR}def f(c: Color): CInt {{ return match c {{ .Red -> 1, .Green -> 2 }}; }}");
    assert_eq!(diagnostics(&source), vec![DiagnosticKind::NonExhaustivePatterns]);
}

#[test]
fn arms_after_a_catch_all_are_unreachable() {
    let source = format!(
        "{COLOR}def f(c: Color): CInt {{ return match c {{ .Red -> 1, else -> 2, .Blue -> 3 }}; }}"
    );
    assert_eq!(diagnostics(&source), vec![DiagnosticKind::UnreachablePattern]);
}

#[test]
fn repeated_and_unknown_cases_are_reported() {
    let source = format!(
        "{COLOR}def f(c: Color): CInt {{ return match c {{ .Red -> 1, .Red -> 2, .Purple -> 3, other -> 4 }}; }}"
    );
    assert_eq!(
        diagnostics(&source),
        vec![DiagnosticKind::UnreachablePattern, DiagnosticKind::UnboundPattern]
    );
}

#[test]
fn arm_types_must_agree() {
    let source = format!(
        "{COLOR}def f(c: Color): CInt {{ return match c {{ .Red -> 1, else -> true }}; }}"
    );
    assert_eq!(
        diagnostics(&source),
        vec![DiagnosticKind::TypeNotAssignable {
            source_type: Type::Bool,
            destination: Type::CInt,
        }]
    );
}

#[test]
fn case_payloads_bind_with_enum_arguments() {
    let program = parse(&[(
        "main",
        indoc! {"
            enum Option[T] { Some(T); None; }
            def unwrap_or(o: Option[Bool], default: Bool): Bool {
                return match o { .Some(x) -> x, .None -> default };
            }
            def bad(o: Option[Bool]): Bool {
                return match o { .Some(x, y) -> x, .None(.Some) -> true };
            }
            def main(): Void {
                val none: Option[CInt] = Option.None[CInt];
                val some = Option.Some(1);
            }
        "},
    )]);
    let mut checker = checker(&program);
    let kinds: Vec<_> = checker.reporter().iter().map(|d| d.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::PatternParamMismatch,
            DiagnosticKind::PatternParamMismatch,
            DiagnosticKind::NestedPatternsNotAllowed,
        ]
    );
    let some = val(function(&program, "main"), "some");
    let Type::Application { callee, args } = checker.type_of_binder(&some.binder).expect("type") else {
        panic!("expected applied enum type");
    };
    assert_eq!(callee.name.to_string(), "main.Option");
    assert_eq!(args, vec![Type::CInt]);
}

#[test]
fn matching_a_non_enum_reports_once() {
    assert_eq!(
        diagnostics("def f(x: CInt): CInt { return match x { .A -> 1, y -> y }; }"),
        vec![DiagnosticKind::ExpectedEnumType]
    );
}

const SHOW: &str = indoc! {"
    interface Show { def show(this: This): CInt; }
    implementation Show for CInt { def show(this: CInt): CInt { return this; } }
    def print[T: Show](value: T): CInt { return value.show(); }
"};

#[test]
fn constraints_resolve_to_implementations() {
    let source = format!("{SHOW}def main(): Void {{ print(1); print(true); }}");
    let program = parse(&[("main", &source)]);
    let checker = checker(&program);
    let kinds: Vec<_> = checker.reporter().iter().map(|d| d.kind.clone()).collect();
    assert_eq!(kinds, vec![DiagnosticKind::NoImplementationFound]);

    let main = function(&program, "main");
    let bindings = checker.constraint_bindings(expression(main, 0)).expect("bindings");
    assert!(matches!(
        bindings,
        [ImplementationBinding::GlobalImpl(def)] if matches!(def.for_type.kind, TypeAnnotationKind::Var(ref name) if name.name == "CInt")
    ));
    assert_eq!(checker.constraint_bindings(expression(main, 1)).map(<[_]>::len), Some(0));
}

#[test]
fn bounded_type_params_expose_interface_methods() {
    let program = parse(&[("main", SHOW)]);
    let checker = checker(&program);
    assert!(checker.reporter().is_empty(), "{:?}", checker.reporter());

    let print = function(&program, "print");
    let BlockMember::Statement(Statement {
        kind: StatementKind::Return(Some(call)),
        ..
    }) = &print.body.members[0]
    else {
        panic!("expected return");
    };
    let ExpressionKind::Call { callee, .. } = &call.kind else {
        panic!("expected call");
    };
    assert!(matches!(
        checker.property_binding(callee),
        Some(PropertyBinding::InterfaceExtensionFunction {
            implementation: ImplementationBinding::TypeBound { type_param_index: 0, .. },
            member_index: 0,
            ..
        })
    ));
    let name = QualifiedName::new(["main", "Show"]);
    assert_eq!(checker.interface_decl(&name).expect("interface").members.len(), 1);
}

const EQ: &str = indoc! {"
    interface Eq[T] { def eq(this: This, other: T): Bool; }
    implementation Eq[CInt] for CInt {
        def eq(this: CInt, other: CInt): Bool { return this == other; }
    }
    def same[T: Eq[T]](a: T, b: T): Bool { return a.eq(b); }
"};

#[test]
fn bounds_may_refer_to_their_own_type_param() {
    let source = format!("{EQ}def main(): Void {{ val s = same(1, 2); }}");
    let program = parse(&[("main", &source)]);
    let mut checker = checker(&program);
    assert!(checker.reporter().is_empty(), "{:?}", checker.reporter());

    let s = val(function(&program, "main"), "s");
    assert_eq!(checker.type_of_binder(&s.binder).expect("type"), Type::Bool);
    assert!(matches!(
        checker.constraint_bindings(&s.rhs),
        Some([ImplementationBinding::GlobalImpl(_)])
    ));
}

const CONV: &str = indoc! {"
    interface Conv[T] { def conv(this: This): T; }
    implementation Conv[Bool] for CInt {
        def conv(this: CInt): Bool { return this > 0; }
    }
    def convert[A: Conv[B], B](a: A): B { return a.conv(); }
"};

#[test]
fn interface_arguments_select_the_implementation() {
    let source = format!(
        "{CONV}def main(): Void {{
            val x = 5;
            val direct = x.conv();
            val converted = convert[CInt, Bool](x);
            val missing = convert[CInt, CInt](x);
        }}"
    );
    let program = parse(&[("main", &source)]);
    let mut checker = checker(&program);
    let kinds: Vec<_> = checker.reporter().iter().map(|d| d.kind.clone()).collect();
    assert_eq!(kinds, vec![DiagnosticKind::NoImplementationFound]);

    let main = function(&program, "main");
    let direct = val(main, "direct");
    assert_eq!(checker.type_of_binder(&direct.binder).expect("type"), Type::Bool);
    let ExpressionKind::Call { callee, .. } = &direct.rhs.kind else {
        panic!("expected call");
    };
    assert!(matches!(
        checker.property_binding(callee),
        Some(PropertyBinding::InterfaceExtensionFunction {
            implementation: ImplementationBinding::GlobalImpl(_),
            ..
        })
    ));

    let converted = val(main, "converted");
    assert_eq!(checker.type_of_binder(&converted.binder).expect("type"), Type::Bool);
    assert!(matches!(
        checker.constraint_bindings(&converted.rhs),
        Some([ImplementationBinding::GlobalImpl(_)])
    ));
    let missing = val(main, "missing");
    assert_eq!(checker.constraint_bindings(&missing.rhs).map(<[_]>::len), Some(0));
}

#[test]
fn overlapping_implementations_abort_the_check() {
    let program = parse(&[(
        "main",
        indoc! {"
            interface Show { def show(this: This): CInt; }
            implementation Show for CInt { def show(this: CInt): CInt { return 1; } }
            implementation Show for CInt { def show(this: CInt): CInt { return 2; } }
            def print[T: Show](value: T): CInt { return 0; }
            def main(): Void { print(1); }
        "},
    )]);
    assert!(matches!(
        check_program(&program, &CheckOptions::default()),
        Err(InternalError::OverlappingImplementations { .. })
    ));
}

#[test]
fn uninferrable_type_param_is_reported_once() {
    assert_eq!(
        diagnostics(indoc! {"
            def make[T](): *T { return nullptr; }
            def main(): Void { make(); }
        "}),
        vec![DiagnosticKind::UninferrableTypeParam("T".into())]
    );
}

#[test]
fn extension_functions_and_missing_properties() {
    let program = parse(&[(
        "main",
        indoc! {"
            def double(this: CInt): CInt { return this * 2; }
            def main(): Void {
                val x = 21;
                val y = x.double();
                x.nope;
            }
        "},
    )]);
    let mut checker = checker(&program);
    let kinds: Vec<_> = checker.reporter().iter().map(|d| d.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![DiagnosticKind::NoSuchProperty {
            ty: Type::CInt,
            property: "nope".into(),
        }]
    );
    let y = val(function(&program, "main"), "y");
    assert_eq!(checker.type_of_binder(&y.binder).expect("type"), Type::CInt);
}

#[test]
fn generic_extension_functions_infer_from_the_receiver() {
    let program = parse(&[(
        "main",
        indoc! {"
            struct Box[T] { val item: T; }
            def get[T](this: *Box[T]): T { return *this.item; }
            def main(): Void {
                val b = new Box(true);
                val item = b.get();
            }
        "},
    )]);
    let mut checker = checker(&program);
    assert!(checker.reporter().is_empty(), "{:?}", checker.reporter());

    let item = val(function(&program, "main"), "item");
    assert_eq!(checker.type_of_binder(&item.binder).expect("type"), Type::Bool);
    assert_eq!(checker.type_args(item.rhs.location), Some(&[Type::Bool][..]));
    let ExpressionKind::Call { callee, .. } = &item.rhs.kind else {
        panic!("expected call");
    };
    assert!(matches!(
        checker.property_binding(callee),
        Some(PropertyBinding::GlobalExtensionFunction { def, .. }) if def.signature.name.name == "get"
    ));
}

#[test]
fn constants_must_be_simple_values() {
    assert_eq!(
        diagnostics(indoc! {"
            enum Color { Red; }
            const A = 1;
            const B = A + 1;
            const C = b\"text\";
            const D = Color.Red;
        "}),
        vec![DiagnosticKind::NotAConst]
    );
}

#[test]
fn val_and_return_are_not_allowed_in_defer() {
    assert_eq!(
        diagnostics(indoc! {"
            def g(): Void {}
            def f(): Void {
                defer g();
                defer val x = 1;
                defer return;
            }
        "}),
        vec![
            DiagnosticKind::StatementNotAllowedInDefer,
            DiagnosticKind::StatementNotAllowedInDefer,
        ]
    );
}

#[test]
fn bare_return_requires_void() {
    assert_eq!(
        diagnostics("def f(): CInt { return; } def g(): Void { return; }"),
        vec![DiagnosticKind::TypeNotAssignable {
            source_type: Type::Void,
            destination: Type::CInt,
        }]
    );
}

#[test]
fn assignments_require_mutable_vals() {
    assert_eq!(
        diagnostics(indoc! {"
            def f(n: CInt): Void {
                val x = 1;
                val mut y = 1;
                x = 2;
                y = 3;
                y = true;
                n = 4;
                z = 5;
                val p: *mut CInt = &mut x;
                val q = &1;
            }
        "}),
        vec![
            DiagnosticKind::ValNotMutable,
            DiagnosticKind::TypeNotAssignable {
                source_type: Type::Bool,
                destination: Type::CInt,
            },
            DiagnosticKind::NotAnAddressableValue,
            DiagnosticKind::UnboundVariable,
            DiagnosticKind::ValNotMutable,
            DiagnosticKind::NotAnAddressableValue,
        ]
    );
}

#[test]
fn pointer_and_equality_operators() {
    let kinds = diagnostics(indoc! {"
        enum Color { Red; }
        def f(p: *CInt, n: Size, c: Color): Bool {
            val q: *CInt = p + n;
            val r = p * n;
            val s: Size = 1 + 2;
            val t = c == c;
            return p == nullptr;
        }
    "});
    assert_eq!(kinds.len(), 3, "{kinds:?}");
    assert_eq!(kinds[0], DiagnosticKind::OperatorNotApplicable(BinaryOperator::Times));
    assert_eq!(
        kinds[1],
        DiagnosticKind::TypeNotAssignable {
            source_type: Type::CInt,
            destination: Type::Size,
        }
    );
    assert!(matches!(
        &kinds[2],
        DiagnosticKind::TypeNotEqualityComparable(Type::Constructor(ctor)) if ctor.name.to_string() == "main.Color"
    ));
}

#[test]
fn pointer_casts_keep_or_demand_mutability() {
    assert_eq!(
        diagnostics(indoc! {"
            def f(p: *CInt, m: *mut CInt): Void {
                val a: *Bool = pointer_cast[Bool](m);
                val b: *mut Bool = pointer_cast[Bool](p);
                val c = pointer_cast[Bool](1);
                val d: *mut Byte = pointer_cast[Byte](m);
            }
        "}),
        vec![
            DiagnosticKind::TypeNotAssignable {
                source_type: Type::ptr(Type::Bool, false),
                destination: Type::ptr(Type::Bool, true),
            },
            DiagnosticKind::NotAPointerType(Type::CInt),
        ]
    );
}

#[test]
fn this_outside_extension_and_unbound_names() {
    assert_eq!(
        diagnostics("def f(): Void { this; missing; val n: Missing = 1; }"),
        vec![
            DiagnosticKind::UnboundThis,
            DiagnosticKind::UnboundVariable,
            DiagnosticKind::UnboundType("Missing".into()),
        ]
    );
}

#[test]
fn repeated_queries_add_no_diagnostics() {
    let source = format!("{ID}def main(): Void {{ val a = id[Bool](42); val b = missing; }}");
    let program = parse(&[("main", &source)]);
    let mut checker = checker(&program);
    let first = checker.reporter().clone();
    assert_eq!(first.len(), 2);

    for declaration in &program.files[0].declarations {
        checker.check_declaration(declaration).expect("internal error");
    }
    let main = function(&program, "main");
    let a = val(main, "a");
    let before = checker.type_of_expression(&a.rhs).expect("type");
    let after = checker.type_of_expression(&a.rhs).expect("type");
    assert_eq!(before, after);
    assert_eq!(checker.type_of_binder(&a.binder).expect("type"), Type::Bool);
    assert_eq!(checker.reporter(), &first);
}

#[test]
fn queries_check_the_enclosing_declaration_on_demand() {
    let source = format!("{ID}def main(): Void {{ val a = id(true); }}");
    let program = parse(&[("main", &source)]);
    let mut checker = Checker::new(ScopeResolver::new(&program), Vec::new());
    let a = val(function(&program, "main"), "a");
    assert_eq!(checker.type_of_expression(&a.rhs).expect("type"), Type::Bool);
}

#[test]
fn module_members_resolve_through_import_aliases() {
    let program = parse(&[
        (
            "main",
            indoc! {"
                import lib.math as math;
                import lib.missing as missing;
                def main(): CInt { return math.add(1, math.two); }
            "},
        ),
        (
            "lib.math",
            indoc! {"
                const two = 2;
                def add(a: CInt, b: CInt): CInt { return a + b; }
            "},
        ),
    ]);
    let kinds: Vec<_> = check_program(&program, &CheckOptions::default())
        .expect("internal error")
        .diagnostics
        .into_iter()
        .map(|d| d.kind)
        .collect();
    assert_eq!(kinds, vec![DiagnosticKind::NoSuchModule]);
}

#[test]
fn diagnostic_limit_truncates_output() {
    let program = parse(&[("main", "def f(): Void { a; b; c; }")]);
    let options = CheckOptions {
        max_diagnostics: Some(2),
    };
    let report = check_program(&program, &options).expect("internal error");
    assert_eq!(report.diagnostics.len(), 2);
    assert_eq!(report.total, 3);
}
