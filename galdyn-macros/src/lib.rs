use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Error, Expr, Fields, Result, Token, Type, parse_macro_input};

/// Derive macro that generates a `Default` implementation for configuration
/// structs and default parameter sets with inline default values.
///
/// String fields accept string literals (converted with `.into()`). A field
/// may carry a unit next to its value, `#[default(3.0, unit = kpc())]`, in
/// which case the field is built with `From<(value, unit)>`; this is how
/// quantity-valued parameter defaults are declared.
///
/// The derive also emits a `FIELD_NAMES` associated constant listing the
/// field names in declaration order, used to report unknown keys when a
/// partial table is loaded.
///
/// # Example
/// ```
/// use galdyn_macros::ConfigDefaults;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(ConfigDefaults, Serialize, Deserialize)]
/// #[serde(default)]
/// pub struct IntegratorConfig {
///     #[default("dopri5")]
///     pub solver: String,
///
///     #[default(1e-7)]
///     pub rtol: f64,
///
///     #[default(Some(4096))]
///     pub max_steps: Option<usize>,
/// }
///
/// let config = IntegratorConfig::default();
/// assert_eq!(config.solver, "dopri5");
/// assert_eq!(config.rtol, 1e-7);
/// assert_eq!(IntegratorConfig::FIELD_NAMES, &["solver", "rtol", "max_steps"]);
/// ```
///
/// # Errors
///
/// The macro produces a compile error if:
/// - Applied to anything other than a struct with named fields
/// - Any field is missing a `#[default(...)]` attribute
/// - The attribute is empty or its second argument is not `unit = ...`
#[proc_macro_derive(ConfigDefaults, attributes(default))]
pub fn config_defaults(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_default_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// A parsed `#[default(...)]` attribute
struct DefaultSpec {
    value: Expr,
    unit: Option<Expr>,
}

fn generate_default_impl(input: DeriveInput) -> Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    &input,
                    "ConfigDefaults only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input,
                "ConfigDefaults can only be derived for structs",
            ));
        }
    };

    let mut field_names = Vec::with_capacity(fields.len());
    let mut field_inits = Vec::with_capacity(fields.len());

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            return Err(Error::new_spanned(field, "unnamed field"));
        };
        let spec = extract_default_spec(field)?;
        let value = &spec.value;

        let init = match &spec.unit {
            Some(unit) => quote! {
                #ident: ::core::convert::From::from((#value, #unit))
            },
            None if is_string_type(&field.ty) => quote! {
                #ident: ::core::convert::Into::into(#value)
            },
            None => quote! { #ident: #value },
        };

        field_names.push(ident.to_string().trim_start_matches("r#").to_string());
        field_inits.push(init);
    }

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::core::default::Default for #name #ty_generics #where_clause {
            fn default() -> Self {
                Self {
                    #(#field_inits),*
                }
            }
        }

        #[automatically_derived]
        impl #impl_generics #name #ty_generics #where_clause {
            /// Field names in declaration order
            pub const FIELD_NAMES: &'static [&'static str] = &[#(#field_names),*];
        }
    })
}

fn is_string_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "String";
        }
    }
    false
}

fn extract_default_spec(field: &syn::Field) -> Result<DefaultSpec> {
    let field_name = field
        .ident
        .as_ref()
        .map(|i| i.to_string())
        .unwrap_or_else(|| "unnamed field".to_string());

    let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("default")) else {
        return Err(Error::new_spanned(
            field,
            format!("Field '{field_name}' must have a #[default(...)] attribute specifying its default value"),
        ));
    };

    let args = attr
        .parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)
        .map_err(|e| {
            Error::new_spanned(
                attr,
                format!("Failed to parse default attribute for field '{field_name}': {e}"),
            )
        })?;

    let mut args = args.into_iter();
    let Some(value) = args.next() else {
        return Err(Error::new_spanned(
            attr,
            format!("Field '{field_name}' has an empty #[default()] attribute. Please provide a default value."),
        ));
    };

    let unit = match args.next() {
        None => None,
        Some(Expr::Assign(assign)) => match assign.left.as_ref() {
            Expr::Path(path) if path.path.is_ident("unit") => Some(*assign.right),
            other => {
                return Err(Error::new_spanned(
                    other,
                    "expected `unit = <expr>` as the second default argument",
                ));
            }
        },
        Some(other) => {
            return Err(Error::new_spanned(
                other,
                "expected `unit = <expr>` as the second default argument",
            ));
        }
    };

    if let Some(extra) = args.next() {
        return Err(Error::new_spanned(extra, "unexpected extra default argument"));
    }

    Ok(DefaultSpec { value, unit })
}
