//! pagekit derive macros: declarative page objects
//!
//! `#[derive(PageObject)]` turns a struct of annotated fields into a page
//! object. Each `#[find(...)]` field becomes a `FieldDecl`; the generated
//! `build` creates the fields in dependency order so `depends_on` targets
//! exist before the fields that search inside them.
//!
//! ```ignore
//! use pagekit::{ElementHandle, ElementList, PageObject};
//!
//! #[derive(PageObject)]
//! #[page(name = "login")]
//! struct LoginPage {
//!     #[find(id = "login-form")]
//!     form: ElementHandle,
//!     #[find(name = "user", depends_on = "form")]
//!     user: ElementHandle,
//!     #[find(xpath = "//button[text()='sign in']", case_insensitive)]
//!     submit: ElementHandle,
//!     #[find(xpath = "//ul[@class='errors']/li", indexed)]
//!     errors: ElementList,
//! }
//! ```
//!
//! # `#[find(...)]` keys
//!
//! - one locator strategy: `id`, `name`, `class_name`, `tag_name`, `css`,
//!   `xpath`, `link_text`, `partial_link_text`, `accessibility_id`,
//!   `android_uiautomator`, `ios_predicate`, `ios_class_chain`
//! - `depends_on = "field"`: search inside another field's element
//! - `indexed`: list items re-resolve by position
//! - `case_insensitive`: fold comparisons to lower case
//! - `localized = "key"`: mark the locator for translation
//! - `label = "..."`: name used in diagnostics and `depends_on`
//!
//! Fields without `#[find]` are initialized with `Default::default()`.

use proc_macro::TokenStream;
use proc_macro2::{Literal, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitStr, Meta, Type};

/// Derive `PageObject`, `Field` and `ListItem` for a struct of element fields.
///
/// # Attributes
///
/// - `#[page(name = "...")]` on the struct: page name used in logs
/// - `#[find(...)]` on fields: see the crate documentation
#[proc_macro_derive(PageObject, attributes(find, page))]
pub fn derive_page_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

// ============================================================================
// Expansion
// ============================================================================

/// Locator strategy keys and the `Strategy` variants they map to
const STRATEGIES: &[(&str, &str)] = &[
    ("id", "Id"),
    ("name", "Name"),
    ("class_name", "ClassName"),
    ("tag_name", "TagName"),
    ("css", "Css"),
    ("xpath", "XPath"),
    ("link_text", "LinkText"),
    ("partial_link_text", "PartialLinkText"),
    ("accessibility_id", "AccessibilityId"),
    ("android_uiautomator", "AndroidUiAutomator"),
    ("ios_predicate", "IosPredicate"),
    ("ios_class_chain", "IosClassChain"),
];

fn strategy_variant(key: &str) -> Option<&'static str> {
    STRATEGIES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, variant)| *variant)
}

/// Parsed `#[find(...)]` attribute
#[derive(Debug, Default)]
struct FindArgs {
    strategy: Option<(&'static str, LitStr)>,
    depends_on: Option<LitStr>,
    indexed: bool,
    case_insensitive: bool,
    localized: Option<LitStr>,
    label: Option<LitStr>,
}

/// A struct field and its declaration, if any
struct PageField<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    find: Option<FindArgs>,
}

fn parse_find(attr: &Attribute) -> syn::Result<FindArgs> {
    let mut args = FindArgs::default();
    attr.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .map(ToString::to_string)
            .unwrap_or_default();
        if let Some(variant) = strategy_variant(&key) {
            if args.strategy.is_some() {
                return Err(meta.error("only one locator strategy is allowed"));
            }
            args.strategy = Some((variant, meta.value()?.parse()?));
            return Ok(());
        }
        match key.as_str() {
            "depends_on" => args.depends_on = Some(meta.value()?.parse()?),
            "localized" => args.localized = Some(meta.value()?.parse()?),
            "label" => args.label = Some(meta.value()?.parse()?),
            "indexed" => args.indexed = true,
            "case_insensitive" => args.case_insensitive = true,
            _ => return Err(meta.error(format!("unknown find key `{key}`"))),
        }
        Ok(())
    })?;
    if args.strategy.is_none() {
        return Err(syn::Error::new_spanned(
            attr,
            "#[find] needs a locator strategy such as `xpath = \"...\"`",
        ));
    }
    Ok(args)
}

fn collect_fields(input: &DeriveInput) -> syn::Result<Vec<PageField<'_>>> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "PageObject can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "PageObject needs a struct with named fields",
        ));
    };
    named
        .named
        .iter()
        .map(|field| {
            let find = field
                .attrs
                .iter()
                .find(|attr| attr.path().is_ident("find"))
                .map(parse_find)
                .transpose()?;
            let ident = field
                .ident
                .as_ref()
                .ok_or_else(|| syn::Error::new_spanned(field, "field has no name"))?;
            Ok(PageField {
                ident,
                ty: &field.ty,
                find,
            })
        })
        .collect()
}

fn label_of(field: &PageField<'_>, find: &FindArgs) -> String {
    find.label
        .as_ref()
        .map_or_else(|| field.ident.to_string(), LitStr::value)
}

fn decl_tokens(label: &str, find: &FindArgs) -> TokenStream2 {
    let mut tokens = match &find.strategy {
        Some((variant, selector)) => {
            let variant = format_ident!("{}", variant);
            quote! {
                ::pagekit::FieldDecl::new(
                    #label,
                    ::pagekit::Locator::new(::pagekit::Strategy::#variant, #selector),
                )
            }
        }
        None => TokenStream2::new(),
    };
    if let Some(dependency) = &find.depends_on {
        tokens.extend(quote! { .depends_on(#dependency) });
    }
    if find.indexed {
        tokens.extend(quote! { .indexed() });
    }
    if find.case_insensitive {
        tokens.extend(quote! { .case_insensitive() });
    }
    if let Some(key) = &find.localized {
        tokens.extend(quote! { .localized(#key) });
    }
    tokens
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let page_name = extract_name_attribute(&input.attrs).unwrap_or_else(|| name.to_string());
    let fields = collect_fields(input)?;

    let mut decls = Vec::new();
    let mut slots = Vec::new();
    let mut arms = Vec::new();
    let mut inits = Vec::new();
    for field in &fields {
        let ident = field.ident;
        let ty = field.ty;
        let Some(find) = &field.find else {
            inits.push(quote! { #ident: ::std::default::Default::default() });
            continue;
        };
        let label = label_of(field, find);
        let index = Literal::usize_unsuffixed(decls.len());
        let slot = format_ident!("__field_{}", ident);
        decls.push(decl_tokens(&label, find));
        slots.push(quote! {
            let mut #slot: ::std::option::Option<#ty> = ::std::option::Option::None;
        });
        arms.push(quote! {
            #index => {
                #slot = ::std::option::Option::Some(
                    <#ty as ::pagekit::Field>::from_decl(ctx, &decls[#index])?,
                );
            }
        });
        inits.push(quote! {
            #ident: #slot.ok_or_else(|| ::pagekit::PageError::UnsupportedOperation {
                message: ::std::format!("field '{}' was not built", #label),
            })?
        });
    }

    Ok(quote! {
        impl #impl_generics ::pagekit::PageObject for #name #ty_generics #where_clause {
            fn field_decls() -> ::std::vec::Vec<::pagekit::FieldDecl> {
                ::std::vec![#(#decls),*]
            }

            fn build(ctx: &mut ::pagekit::PageContext) -> ::pagekit::PageResult<Self> {
                let decls = <Self as ::pagekit::PageObject>::field_decls();
                #(#slots)*
                for index in ::pagekit::plan_build_order(&decls)? {
                    match index {
                        #(#arms)*
                        _ => {}
                    }
                }
                ::std::result::Result::Ok(Self {
                    #(#inits,)*
                })
            }

            fn page_name() -> &'static str {
                #page_name
            }
        }

        impl #impl_generics ::pagekit::Field for #name #ty_generics #where_clause {
            fn from_decl(
                ctx: &mut ::pagekit::PageContext,
                decl: &::pagekit::FieldDecl,
            ) -> ::pagekit::PageResult<Self> {
                ctx.component::<Self>(decl)
            }
        }

        impl #impl_generics ::pagekit::ListItem for #name #ty_generics #where_clause {
            fn from_handle(
                ctx: &::pagekit::PageContext,
                handle: ::pagekit::ElementHandle,
            ) -> ::pagekit::PageResult<Self> {
                let mut inner = ctx.within(&handle)?;
                <Self as ::pagekit::PageObject>::build(&mut inner)
            }
        }
    })
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract the `name` attribute from `#[page(name = "...")]`
fn extract_name_attribute(attrs: &[Attribute]) -> Option<String> {
    for attr in attrs {
        if attr.path().is_ident("page") {
            if let Ok(Meta::NameValue(nv)) = attr.parse_args::<Meta>() {
                if nv.path.is_ident("name") {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(s),
                        ..
                    }) = &nv.value
                    {
                        return Some(s.value());
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand_str(input: &DeriveInput) -> String {
        expand(input).unwrap().to_string()
    }

    #[test]
    fn test_strategy_keys() {
        assert_eq!(strategy_variant("xpath"), Some("XPath"));
        assert_eq!(strategy_variant("android_uiautomator"), Some("AndroidUiAutomator"));
        assert_eq!(strategy_variant("label"), None);
        assert_eq!(STRATEGIES.len(), 12);
    }

    #[test]
    fn test_parse_find_flags() {
        let attr: Attribute = parse_quote! {
            #[find(xpath = "//tr", depends_on = "table", indexed, case_insensitive, localized = "rows", label = "row")]
        };
        let args = parse_find(&attr).unwrap();
        let (variant, selector) = args.strategy.unwrap();
        assert_eq!(variant, "XPath");
        assert_eq!(selector.value(), "//tr");
        assert_eq!(args.depends_on.unwrap().value(), "table");
        assert!(args.indexed && args.case_insensitive);
        assert_eq!(args.localized.unwrap().value(), "rows");
        assert_eq!(args.label.unwrap().value(), "row");
    }

    #[test]
    fn test_parse_find_errors() {
        let missing: Attribute = parse_quote!(#[find(indexed)]);
        assert!(parse_find(&missing).is_err());
        let twice: Attribute = parse_quote!(#[find(id = "a", css = "b")]);
        assert!(parse_find(&twice).is_err());
        let unknown: Attribute = parse_quote!(#[find(id = "a", cached)]);
        let err = parse_find(&unknown).unwrap_err();
        assert!(err.to_string().contains("cached"));
    }

    #[test]
    fn test_expand_declares_fields_in_order() {
        let input: DeriveInput = parse_quote! {
            struct Login {
                #[find(id = "form")]
                form: ElementHandle,
                #[find(name = "user", depends_on = "form")]
                user: ElementHandle,
                notes: Vec<String>,
            }
        };
        let out = expand_str(&input);
        assert!(out.contains("Strategy :: Id"));
        assert!(out.contains("Strategy :: Name"));
        assert!(out.contains(". depends_on (\"form\")"));
        assert!(out.contains("plan_build_order"));
        assert!(out.contains("notes : :: std :: default :: Default :: default ()"));
        assert!(out.contains("\"Login\""));
    }

    #[test]
    fn test_page_name_attribute() {
        let input: DeriveInput = parse_quote! {
            #[page(name = "checkout")]
            struct Checkout {}
        };
        assert_eq!(extract_name_attribute(&input.attrs).as_deref(), Some("checkout"));
        assert!(expand_str(&input).contains("\"checkout\""));
    }

    #[test]
    fn test_rejects_non_structs() {
        let input: DeriveInput = parse_quote! {
            enum Screen { A, B }
        };
        assert!(expand(&input).is_err());
        let tuple: DeriveInput = parse_quote! {
            struct Pair(ElementHandle, ElementHandle);
        };
        assert!(expand(&tuple).is_err());
    }
}
