/// Declare a unit-struct [`Rule`](crate::rule::Rule).
///
/// ```ignore
/// define_rule!(
///     /// `(e)` -> `e`
///     StripGroupingRule {
///         name: "Strip Grouping",
///         description: "Drop written parentheses and brackets",
///         priority: 100,
///         targets: [NodeKind::Grouped],
///     },
///     matches |ctx, expr| { matches!(ctx.get(expr), Expr::Grouped(..)) },
///     transform |ctx, expr| { ... }
/// );
/// ```
#[macro_export]
macro_rules! define_rule {
    (
        $(#[$meta:meta])*
        $struct_name:ident {
            name: $name:expr,
            description: $desc:expr,
            priority: $prio:expr,
            targets: [$($target:expr),* $(,)?],
            regions: $regions:expr $(,)?
        },
        matches |$mctx:ident, $marg:ident| $mbody:block,
        transform |$tctx:ident, $targ:ident| $tbody:block $(,)?
    ) => {
        $(#[$meta])*
        pub struct $struct_name;

        impl $crate::rule::Rule for $struct_name {
            fn name(&self) -> &str {
                $name
            }

            fn description(&self) -> &str {
                $desc
            }

            fn priority(&self) -> i32 {
                $prio
            }

            fn regions(&self) -> $crate::region::RegionSet {
                $regions
            }

            fn target_kinds(&self) -> Option<&'static [equiv_ast::NodeKind]> {
                Some(&[$($target),*])
            }

            fn matches(&self, $mctx: &equiv_ast::Context, $marg: equiv_ast::ExprId) -> bool $mbody

            fn transform(
                &self,
                $tctx: &mut equiv_ast::Context,
                $targ: equiv_ast::ExprId,
            ) -> equiv_ast::ExprId $tbody
        }
    };
    (
        $(#[$meta:meta])*
        $struct_name:ident {
            name: $name:expr,
            description: $desc:expr,
            priority: $prio:expr,
            targets: [$($target:expr),* $(,)?] $(,)?
        },
        matches |$mctx:ident, $marg:ident| $mbody:block,
        transform |$tctx:ident, $targ:ident| $tbody:block $(,)?
    ) => {
        $crate::define_rule!(
            $(#[$meta])*
            $struct_name {
                name: $name,
                description: $desc,
                priority: $prio,
                targets: [$($target),*],
                regions: $crate::region::RegionSet::ALL,
            },
            matches |$mctx, $marg| $mbody,
            transform |$tctx, $targ| $tbody
        );
    };
}
