use super::*;
use crate::ast::{
    EnumDecl, ErrorSetDecl, ExprKind, FieldInit, FuncDecl, Param, StructDecl, StructFieldDecl,
    StructLiteral, SwitchArm, TypeKind,
};
use crate::common::Span;
use pretty_assertions::assert_eq;

fn sp(start: usize, end: usize) -> Span {
    Span::new(start, end)
}

fn validate(stmts: Vec<Stmt>) -> (TypeValidator, bool) {
    let module = Module::new("main", "main.luma", stmts);
    let mut validator = TypeValidator::new();
    let ok = validator.validate_modules(&[module]);
    (validator, ok)
}

fn codes(validator: &TypeValidator) -> Vec<DiagnosticCode> {
    validator
        .diagnostics
        .diagnostics()
        .iter()
        .map(|d| d.code)
        .collect()
}

fn let_stmt(name: &str, ty: Option<TypeNode>, init: Option<Expr>, mutable: bool, at: usize) -> Stmt {
    Stmt::new(
        StmtKind::Let {
            name: name.to_string(),
            ty,
            init,
            mutable,
        },
        sp(at, at + 10),
    )
}

fn def_type(name: &str, ty: TypeNode, at: usize) -> Stmt {
    Stmt::new(
        StmtKind::Def {
            name: name.to_string(),
            ty: Some(ty),
            init: None,
            is_public: false,
        },
        sp(at, at + 10),
    )
}

fn func_stmt(
    name: &str,
    params: Vec<Param>,
    return_type: Option<TypeNode>,
    error_type: Option<TypeNode>,
    body: Vec<Stmt>,
    at: usize,
) -> Stmt {
    Stmt::new(
        StmtKind::Func(FuncDecl {
            name: name.to_string(),
            params,
            return_type,
            error_type,
            body,
            is_static: false,
            is_public: false,
            span: sp(at, at + 20),
        }),
        sp(at, at + 20),
    )
}

fn point_def(at: usize) -> Stmt {
    def_type(
        "Point",
        TypeNode::new(
            TypeKind::Struct(StructDecl {
                name: "Point".to_string(),
                fields: vec![
                    StructFieldDecl {
                        name: "x".to_string(),
                        ty: TypeNode::primitive(PrimitiveType::I32, sp(at + 1, at + 2)),
                        is_static: false,
                        default: None,
                        span: sp(at + 1, at + 2),
                    },
                    StructFieldDecl {
                        name: "y".to_string(),
                        ty: TypeNode::primitive(PrimitiveType::I32, sp(at + 3, at + 4)),
                        is_static: false,
                        default: None,
                        span: sp(at + 3, at + 4),
                    },
                ],
                methods: Vec::new(),
            }),
            sp(at, at + 8),
        ),
        at,
    )
}

fn color_def(at: usize) -> Stmt {
    def_type(
        "Color",
        TypeNode::new(
            TypeKind::Enum(EnumDecl {
                name: "Color".to_string(),
                variants: vec![
                    ("Red".to_string(), sp(at + 1, at + 2)),
                    ("Green".to_string(), sp(at + 3, at + 4)),
                    ("Blue".to_string(), sp(at + 5, at + 6)),
                ],
            }),
            sp(at, at + 8),
        ),
        at,
    )
}

#[test]
fn test_clean_module_validates() {
    let stmts = vec![
        let_stmt(
            "x",
            Some(TypeNode::primitive(PrimitiveType::I32, sp(100, 103))),
            Some(Expr::int("42", sp(106, 108))),
            false,
            100,
        ),
        Stmt::expr(Expr::call(
            Expr::ident("print", sp(120, 125)),
            vec![Expr::ident("x", sp(126, 127))],
            sp(120, 128),
        )),
    ];
    let (validator, ok) = validate(stmts);
    assert!(ok, "unexpected diagnostics: {:?}", codes(&validator));
    assert!(validator.diagnostics.is_empty());
}

#[test]
fn test_undefined_identifier_fails_validation() {
    let stmts = vec![Stmt::expr(Expr::ident("nope", sp(10, 14)))];
    let (validator, ok) = validate(stmts);
    assert!(!ok);
    assert_eq!(codes(&validator), vec![DiagnosticCode::UndefinedIdentifier]);
}

#[test]
fn test_struct_literal_missing_and_unknown_fields() {
    let lit = Expr::new(
        ExprKind::StructLiteral(StructLiteral {
            name: Some("Point".to_string()),
            fields: vec![
                FieldInit {
                    name: "x".to_string(),
                    value: Expr::int("1", sp(120, 121)),
                    span: sp(117, 121),
                },
                FieldInit {
                    name: "z".to_string(),
                    value: Expr::int("5", sp(126, 127)),
                    span: sp(123, 127),
                },
            ],
        }),
        sp(110, 130),
    );
    let (validator, ok) = validate(vec![point_def(10), Stmt::expr(lit)]);
    assert!(!ok);

    let diagnostics = validator.diagnostics.diagnostics();
    let unknown = diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::UnknownField)
        .unwrap();
    assert_eq!(unknown.subject.as_deref(), Some("z"));
    let missing = diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::MissingField)
        .unwrap();
    assert_eq!(missing.subject.as_deref(), Some("y"));
}

#[test]
fn test_switch_over_enum_reports_uncovered_variant() {
    let scrutinee_let = let_stmt(
        "c",
        Some(TypeNode::named("Color", sp(100, 105))),
        Some(Expr::member(
            Expr::ident("Color", sp(108, 113)),
            "Red",
            sp(108, 117),
        )),
        false,
        100,
    );
    let switch = Expr::new(
        ExprKind::Switch {
            scrutinee: Box::new(Expr::ident("c", sp(130, 131))),
            arms: vec![
                SwitchArm {
                    labels: vec![Expr::member(
                        Expr::ident("Color", sp(140, 145)),
                        "Red",
                        sp(140, 149),
                    )],
                    body: Box::new(Expr::int("1", sp(153, 154))),
                    is_default: false,
                    span: sp(140, 154),
                },
                SwitchArm {
                    labels: vec![Expr::member(
                        Expr::ident("Color", sp(160, 165)),
                        "Green",
                        sp(160, 171),
                    )],
                    body: Box::new(Expr::int("2", sp(175, 176))),
                    is_default: false,
                    span: sp(160, 176),
                },
            ],
        },
        sp(125, 180),
    );
    let (validator, ok) = validate(vec![color_def(10), scrutinee_let, Stmt::expr(switch)]);
    assert!(!ok);

    let diagnostics = validator.diagnostics.diagnostics();
    let uncovered = diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::TypeMismatch)
        .unwrap();
    assert!(uncovered.message.contains("Blue"), "{}", uncovered.message);
}

#[test]
fn test_switch_with_default_is_exhaustive() {
    let scrutinee_let = let_stmt(
        "c",
        Some(TypeNode::named("Color", sp(100, 105))),
        Some(Expr::member(
            Expr::ident("Color", sp(108, 113)),
            "Red",
            sp(108, 117),
        )),
        false,
        100,
    );
    let switch = Expr::new(
        ExprKind::Switch {
            scrutinee: Box::new(Expr::ident("c", sp(130, 131))),
            arms: vec![
                SwitchArm {
                    labels: vec![Expr::member(
                        Expr::ident("Color", sp(140, 145)),
                        "Red",
                        sp(140, 149),
                    )],
                    body: Box::new(Expr::int("1", sp(153, 154))),
                    is_default: false,
                    span: sp(140, 154),
                },
                SwitchArm {
                    labels: Vec::new(),
                    body: Box::new(Expr::int("0", sp(165, 166))),
                    is_default: true,
                    span: sp(160, 166),
                },
            ],
        },
        sp(125, 170),
    );
    let (validator, ok) = validate(vec![color_def(10), scrutinee_let, Stmt::expr(switch)]);
    assert!(ok, "unexpected diagnostics: {:?}", codes(&validator));
}

#[test]
fn test_instance_field_through_type_name() {
    let access = Expr::member(Expr::ident("Point", sp(110, 115)), "x", sp(110, 117));
    let (validator, ok) = validate(vec![point_def(10), Stmt::expr(access)]);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::InvalidStaticAccess));
}

#[test]
fn test_static_field_in_constructor() {
    let counter = def_type(
        "Counter",
        TypeNode::new(
            TypeKind::Struct(StructDecl {
                name: "Counter".to_string(),
                fields: vec![
                    StructFieldDecl {
                        name: "count".to_string(),
                        ty: TypeNode::primitive(PrimitiveType::I32, sp(12, 15)),
                        is_static: false,
                        default: None,
                        span: sp(11, 15),
                    },
                    StructFieldDecl {
                        name: "total".to_string(),
                        ty: TypeNode::primitive(PrimitiveType::I32, sp(17, 20)),
                        is_static: true,
                        default: None,
                        span: sp(16, 20),
                    },
                ],
                methods: Vec::new(),
            }),
            sp(10, 22),
        ),
        10,
    );
    let lit = Expr::new(
        ExprKind::StructLiteral(StructLiteral {
            name: Some("Counter".to_string()),
            fields: vec![
                FieldInit {
                    name: "count".to_string(),
                    value: Expr::int("1", sp(120, 121)),
                    span: sp(112, 121),
                },
                FieldInit {
                    name: "total".to_string(),
                    value: Expr::int("2", sp(130, 131)),
                    span: sp(123, 131),
                },
            ],
        }),
        sp(110, 134),
    );
    let (validator, ok) = validate(vec![counter, Stmt::expr(lit)]);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::StaticFieldInConstructor));
    // the instance field is present, so nothing is missing
    assert!(!codes(&validator).contains(&DiagnosticCode::MissingField));
}

#[test]
fn test_instance_access_from_static_method() {
    let gauge = def_type(
        "Gauge",
        TypeNode::new(
            TypeKind::Struct(StructDecl {
                name: "Gauge".to_string(),
                fields: vec![StructFieldDecl {
                    name: "value".to_string(),
                    ty: TypeNode::primitive(PrimitiveType::I32, sp(12, 15)),
                    is_static: false,
                    default: None,
                    span: sp(11, 15),
                }],
                methods: vec![FuncDecl {
                    name: "reset".to_string(),
                    params: Vec::new(),
                    return_type: None,
                    error_type: None,
                    body: vec![Stmt::expr(Expr::member(
                        Expr::ident("self", sp(30, 34)),
                        "value",
                        sp(30, 40),
                    ))],
                    is_static: true,
                    is_public: false,
                    span: sp(25, 45),
                }],
            }),
            sp(10, 50),
        ),
        10,
    );
    let (validator, ok) = validate(vec![gauge]);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::InstanceAccessInStatic));
}

#[test]
fn test_bare_instance_field_in_static_method() {
    let gauge = def_type(
        "Gauge",
        TypeNode::new(
            TypeKind::Struct(StructDecl {
                name: "Gauge".to_string(),
                fields: vec![StructFieldDecl {
                    name: "value".to_string(),
                    ty: TypeNode::primitive(PrimitiveType::I32, sp(12, 15)),
                    is_static: false,
                    default: None,
                    span: sp(11, 15),
                }],
                methods: vec![FuncDecl {
                    name: "peek".to_string(),
                    params: Vec::new(),
                    return_type: Some(TypeNode::primitive(PrimitiveType::I32, sp(28, 31))),
                    error_type: None,
                    body: vec![Stmt::new(
                        StmtKind::Return(Some(Expr::ident("value", sp(40, 45)))),
                        sp(33, 45),
                    )],
                    is_static: true,
                    is_public: false,
                    span: sp(25, 50),
                }],
            }),
            sp(10, 55),
        ),
        10,
    );
    let (validator, ok) = validate(vec![gauge]);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::InstanceAccessInStatic));
}

#[test]
fn test_static_method_through_instance_is_clean() {
    let widget = def_type(
        "Widget",
        TypeNode::new(
            TypeKind::Struct(StructDecl {
                name: "Widget".to_string(),
                fields: vec![StructFieldDecl {
                    name: "id".to_string(),
                    ty: TypeNode::primitive(PrimitiveType::I32, sp(12, 15)),
                    is_static: false,
                    default: None,
                    span: sp(11, 15),
                }],
                methods: vec![FuncDecl {
                    name: "describe".to_string(),
                    params: Vec::new(),
                    return_type: None,
                    error_type: None,
                    body: Vec::new(),
                    is_static: true,
                    is_public: false,
                    span: sp(25, 45),
                }],
            }),
            sp(10, 50),
        ),
        10,
    );
    let literal = Expr::new(
        ExprKind::StructLiteral(StructLiteral {
            name: Some("Widget".to_string()),
            fields: vec![FieldInit {
                name: "id".to_string(),
                value: Expr::int("1", sp(118, 119)),
                span: sp(112, 119),
            }],
        }),
        sp(110, 122),
    );
    let stmts = vec![
        widget,
        let_stmt("w", None, Some(literal), false, 100),
        Stmt::expr(Expr::call(
            Expr::member(Expr::ident("w", sp(130, 131)), "describe", sp(130, 140)),
            Vec::new(),
            sp(130, 142),
        )),
    ];
    let (validator, ok) = validate(stmts);
    assert!(ok, "{:?}", codes(&validator));
    assert!(codes(&validator).is_empty());
}

#[test]
fn test_immutable_assignment_reports_mutability_only() {
    let stmts = vec![
        let_stmt("x", None, Some(Expr::int("1", sp(18, 19))), false, 10),
        Stmt::expr(Expr::new(
            ExprKind::Assign {
                target: Box::new(Expr::ident("x", sp(30, 31))),
                value: Box::new(Expr::boolean(true, sp(34, 38))),
            },
            sp(30, 38),
        )),
    ];
    let (validator, ok) = validate(stmts);
    assert!(!ok);
    // mutability short-circuits; the bool/int mismatch is never reported
    assert_eq!(codes(&validator), vec![DiagnosticCode::MutabilityMismatch]);
}

#[test]
fn test_literal_overflow_cites_target_range() {
    let stmts = vec![let_stmt(
        "x",
        Some(TypeNode::primitive(PrimitiveType::I8, sp(10, 12))),
        Some(Expr::int("200", sp(15, 18))),
        false,
        10,
    )];
    let (validator, ok) = validate(stmts);
    assert!(!ok);

    let diagnostics = validator.diagnostics.diagnostics();
    let overflow = diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::LiteralOverflow)
        .unwrap();
    assert!(overflow.message.contains("-128..127"), "{}", overflow.message);
}

#[test]
fn test_circular_alias_detected() {
    let stmts = vec![
        def_type("A", TypeNode::named("B", sp(14, 15)), 10),
        def_type("B", TypeNode::named("A", sp(34, 35)), 30),
    ];
    let (validator, ok) = validate(stmts);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::CircularTypeDependency));
}

fn node_def(field_ty: TypeNode, at: usize) -> Stmt {
    def_type(
        "Node",
        TypeNode::new(
            TypeKind::Struct(StructDecl {
                name: "Node".to_string(),
                fields: vec![StructFieldDecl {
                    name: "next".to_string(),
                    ty: field_ty,
                    is_static: false,
                    default: None,
                    span: sp(at + 1, at + 2),
                }],
                methods: Vec::new(),
            }),
            sp(at, at + 8),
        ),
        at,
    )
}

#[test]
fn test_self_reference_through_optional_is_accepted() {
    let stmts = vec![node_def(
        TypeNode::optional(TypeNode::named("Node", sp(12, 16))),
        10,
    )];
    let (validator, _) = validate(stmts);
    assert!(!codes(&validator).contains(&DiagnosticCode::CircularTypeDependency));
}

#[test]
fn test_self_reference_by_value_is_rejected() {
    let stmts = vec![node_def(TypeNode::named("Node", sp(12, 16)), 10)];
    let (validator, ok) = validate(stmts);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::CircularTypeDependency));
}

#[test]
fn test_missing_return_reported() {
    let stmts = vec![func_stmt(
        "answer",
        Vec::new(),
        Some(TypeNode::primitive(PrimitiveType::I32, sp(20, 23))),
        None,
        Vec::new(),
        10,
    )];
    let (validator, ok) = validate(stmts);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::MissingReturn));
}

#[test]
fn test_return_inside_loop_satisfies_missing_return() {
    let body = vec![Stmt::new(
        StmtKind::While {
            condition: Expr::boolean(true, sp(45, 49)),
            body: vec![Stmt::new(
                StmtKind::Return(Some(Expr::int("42", sp(60, 62)))),
                sp(53, 62),
            )],
        },
        sp(40, 65),
    )];
    let stmts = vec![func_stmt(
        "spin",
        Vec::new(),
        Some(TypeNode::primitive(PrimitiveType::I32, sp(30, 33))),
        None,
        body,
        20,
    )];
    let (validator, ok) = validate(stmts);
    assert!(ok, "{:?}", codes(&validator));
    assert!(!codes(&validator).contains(&DiagnosticCode::MissingReturn));
}

#[test]
fn test_return_on_every_path_accepted() {
    let stmts = vec![func_stmt(
        "answer",
        Vec::new(),
        Some(TypeNode::primitive(PrimitiveType::I32, sp(20, 23))),
        None,
        vec![Stmt::new(
            StmtKind::Return(Some(Expr::int("42", sp(40, 42)))),
            sp(33, 42),
        )],
        10,
    )];
    let (validator, ok) = validate(stmts);
    assert!(ok, "unexpected diagnostics: {:?}", codes(&validator));
}

#[test]
fn test_throw_rules() {
    // module-level throw
    let (validator, _) = validate(vec![Stmt::new(
        StmtKind::Throw(Expr::ident("Oops", sp(16, 20))),
        sp(10, 20),
    )]);
    assert!(codes(&validator).contains(&DiagnosticCode::ThrowOutsideFunction));

    // throw without a declared error type
    let (validator, _) = validate(vec![func_stmt(
        "f",
        Vec::new(),
        None,
        None,
        vec![Stmt::new(
            StmtKind::Throw(Expr::int("1", sp(36, 37))),
            sp(30, 37),
        )],
        10,
    )]);
    assert!(codes(&validator).contains(&DiagnosticCode::ThrowWithoutErrorType));

    // throw of a member outside the declared set
    let errors = def_type(
        "IoError",
        TypeNode::new(
            TypeKind::ErrorSet(ErrorSetDecl {
                name: "IoError".to_string(),
                members: vec![
                    ("NotFound".to_string(), sp(12, 14)),
                    ("Busy".to_string(), sp(16, 18)),
                ],
            }),
            sp(10, 20),
        ),
        10,
    );
    let bad_throw = func_stmt(
        "g",
        Vec::new(),
        None,
        Some(TypeNode::named("IoError", sp(40, 47))),
        vec![Stmt::new(
            StmtKind::Throw(Expr::member(
                Expr::ident("IoError", sp(56, 63)),
                "Timeout",
                sp(56, 71),
            )),
            sp(50, 71),
        )],
        35,
    );
    let (validator, ok) = validate(vec![errors.clone(), bad_throw]);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::ThrowTypeMismatch));

    // throw of a declared member is accepted
    let good_throw = func_stmt(
        "g",
        Vec::new(),
        None,
        Some(TypeNode::named("IoError", sp(40, 47))),
        vec![Stmt::new(
            StmtKind::Throw(Expr::member(
                Expr::ident("IoError", sp(56, 63)),
                "Busy",
                sp(56, 69),
            )),
            sp(50, 69),
        )],
        35,
    );
    let (validator, ok) = validate(vec![errors, good_throw]);
    assert!(ok, "unexpected diagnostics: {:?}", codes(&validator));
}

#[test]
fn test_call_checking() {
    // builtin print takes exactly one argument
    let (validator, ok) = validate(vec![Stmt::expr(Expr::call(
        Expr::ident("print", sp(10, 15)),
        Vec::new(),
        sp(10, 17),
    ))]);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::ArgumentCountMismatch));

    let (validator, _) = validate(vec![Stmt::expr(Expr::call(
        Expr::ident("launch", sp(10, 16)),
        Vec::new(),
        sp(10, 18),
    ))]);
    assert!(codes(&validator).contains(&DiagnosticCode::UndefinedFunction));

    // calling a plain value
    let stmts = vec![
        let_stmt("x", None, Some(Expr::int("1", sp(18, 19))), false, 10),
        Stmt::expr(Expr::call(
            Expr::ident("x", sp(30, 31)),
            Vec::new(),
            sp(30, 33),
        )),
    ];
    let (validator, _) = validate(stmts);
    assert!(codes(&validator).contains(&DiagnosticCode::NotCallable));
}

#[test]
fn test_loop_condition_must_be_bool() {
    let stmts = vec![Stmt::new(
        StmtKind::While {
            condition: Expr::int("1", sp(16, 17)),
            body: Vec::new(),
        },
        sp(10, 20),
    )];
    let (validator, ok) = validate(stmts);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::ConditionNotBool));
}

#[test]
fn test_builtin_alias_resolves() {
    let stmts = vec![let_stmt(
        "n",
        Some(TypeNode::named("int", sp(10, 13))),
        Some(Expr::int("5", sp(16, 17))),
        false,
        10,
    )];
    let (validator, ok) = validate(stmts);
    assert!(ok, "unexpected diagnostics: {:?}", codes(&validator));
}

#[test]
fn test_import_members_pass_through() {
    let stmts = vec![
        Stmt::new(
            StmtKind::Use(UseDecl {
                module_path: "std/io".to_string(),
                alias: None,
                span: sp(10, 20),
            }),
            sp(10, 20),
        ),
        Stmt::expr(Expr::call(
            Expr::member(Expr::ident("io", sp(30, 32)), "read_line", sp(30, 42)),
            Vec::new(),
            sp(30, 44),
        )),
    ];
    let (validator, ok) = validate(stmts);
    assert!(ok, "unexpected diagnostics: {:?}", codes(&validator));
}

#[test]
fn test_shadowed_parameter_warns() {
    let stmts = vec![func_stmt(
        "f",
        vec![Param {
            name: "x".to_string(),
            ty: Some(TypeNode::primitive(PrimitiveType::I32, sp(14, 17))),
            span: sp(12, 17),
        }],
        None,
        None,
        vec![Stmt::new(
            StmtKind::Block(vec![let_stmt(
                "x",
                None,
                Some(Expr::int("2", sp(40, 41))),
                false,
                34,
            )]),
            sp(30, 45),
        )],
        10,
    )];
    let (validator, ok) = validate(stmts);
    // shadowing and unused bindings are warnings, not errors
    assert!(ok, "unexpected diagnostics: {:?}", codes(&validator));
    assert!(codes(&validator).contains(&DiagnosticCode::ShadowedParameter));
}

#[test]
fn test_duplicate_module_definition_warns() {
    let stmts = vec![
        Stmt::new(
            StmtKind::Def {
                name: "limit".to_string(),
                ty: None,
                init: Some(Expr::int("1", sp(22, 23))),
                is_public: false,
            },
            sp(10, 23),
        ),
        Stmt::new(
            StmtKind::Def {
                name: "limit".to_string(),
                ty: None,
                init: Some(Expr::int("2", sp(42, 43))),
                is_public: false,
            },
            sp(30, 43),
        ),
    ];
    let (validator, ok) = validate(stmts);
    assert!(ok, "unexpected diagnostics: {:?}", codes(&validator));
    assert!(codes(&validator).contains(&DiagnosticCode::DuplicateSymbol));
}

#[test]
fn test_unused_local_warns() {
    let stmts = vec![func_stmt(
        "f",
        Vec::new(),
        None,
        None,
        vec![let_stmt(
            "leftover",
            None,
            Some(Expr::int("1", sp(40, 41))),
            false,
            30,
        )],
        10,
    )];
    let (validator, ok) = validate(stmts);
    assert!(ok);
    let diagnostics = validator.diagnostics.diagnostics();
    let unused = diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::UnusedVariable)
        .unwrap();
    assert_eq!(unused.subject.as_deref(), Some("leftover"));
}

#[test]
fn test_bool_switch_needs_both_literals() {
    let stmts = vec![
        let_stmt(
            "flag",
            Some(TypeNode::bool(sp(10, 14))),
            Some(Expr::boolean(true, sp(17, 21))),
            false,
            10,
        ),
        Stmt::expr(Expr::new(
            ExprKind::Switch {
                scrutinee: Box::new(Expr::ident("flag", sp(30, 34))),
                arms: vec![SwitchArm {
                    labels: vec![Expr::boolean(true, sp(40, 44))],
                    body: Box::new(Expr::int("1", sp(48, 49))),
                    is_default: false,
                    span: sp(40, 49),
                }],
            },
            sp(25, 55),
        )),
    ];
    let (validator, ok) = validate(stmts);
    assert!(!ok);
    let diagnostics = validator.diagnostics.diagnostics();
    let uncovered = diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::TypeMismatch)
        .unwrap();
    assert!(uncovered.message.contains("false"), "{}", uncovered.message);
}

#[test]
fn test_type_cache_truncates_older_half() {
    let mut validator = TypeValidator::new();
    for i in 0..TYPE_CACHE_LIMIT {
        let key = ("main".to_string(), i, i + 1, "IntLiteral");
        validator
            .type_cache
            .insert(key.clone(), TypeNode::primitive(PrimitiveType::I32, sp(i, i + 1)));
        validator.cache_order.push(key);
    }

    let module = Module::new(
        "main",
        "main.luma",
        vec![Stmt::expr(Expr::int(
            "7",
            sp(TYPE_CACHE_LIMIT + 10, TYPE_CACHE_LIMIT + 11),
        ))],
    );
    validator.validate_modules(&[module]);

    // the older half was dropped, the newer half and the fresh entry stay
    assert_eq!(
        validator.type_cache.len(),
        TYPE_CACHE_LIMIT - TYPE_CACHE_LIMIT / 2 + 1
    );
    assert!(!validator
        .type_cache
        .contains_key(&("main".to_string(), 0, 1, "IntLiteral")));
    assert!(validator.type_cache.contains_key(&(
        "main".to_string(),
        TYPE_CACHE_LIMIT - 1,
        TYPE_CACHE_LIMIT,
        "IntLiteral"
    )));
}

#[test]
fn test_array_size_rules() {
    // zero-sized array
    let zero = def_type(
        "Empty",
        TypeNode::new(
            TypeKind::Array {
                element: Box::new(TypeNode::primitive(PrimitiveType::U8, sp(12, 14))),
                size: Some(Box::new(Expr::int("0", sp(16, 17)))),
            },
            sp(10, 18),
        ),
        10,
    );
    let (validator, ok) = validate(vec![zero]);
    assert!(!ok);
    assert!(codes(&validator).contains(&DiagnosticCode::InvalidArraySize));

    // a valid comptime size
    let sized = def_type(
        "Buf",
        TypeNode::new(
            TypeKind::Array {
                element: Box::new(TypeNode::primitive(PrimitiveType::U8, sp(12, 14))),
                size: Some(Box::new(Expr::int("64", sp(16, 18)))),
            },
            sp(10, 19),
        ),
        10,
    );
    let (validator, ok) = validate(vec![sized]);
    assert!(ok, "unexpected diagnostics: {:?}", codes(&validator));
}
