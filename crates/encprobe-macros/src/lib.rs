use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Expr, ItemFn, MetaNameValue, Token, parse_macro_input};

/// Counts the function as a running encoder component for the duration of
/// each call. When the last component returns, leaked resources are
/// reported.
#[proc_macro_attribute]
pub fn component(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    let output = if sig.asyncness.is_some() {
        quote! {
            #(#attrs)*
            #vis #sig {
                async {
                    let _encprobe_component = encprobe::ComponentScope::new();
                    #block
                }.await
            }
        }
    } else {
        quote! {
            #(#attrs)*
            #vis #sig {
                let _encprobe_component = encprobe::ComponentScope::new();
                #block
            }
        }
    };

    output.into()
}

struct StageArgs {
    stage: Expr,
    work_id: Expr,
    segment: Option<Expr>,
    tile: Option<Expr>,
    input: Option<Expr>,
    output: Option<Expr>,
}

impl StageArgs {
    fn parse(attr: TokenStream) -> syn::Result<Self> {
        let parser = Punctuated::<MetaNameValue, Token![,]>::parse_terminated;
        let pairs = syn::parse::Parser::parse(parser, attr)?;

        let mut stage = None;
        let mut work_id = None;
        let mut segment = None;
        let mut tile = None;
        let mut input = None;
        let mut output = None;

        for pair in pairs {
            let Some(ident) = pair.path.get_ident() else {
                return Err(syn::Error::new_spanned(&pair.path, "expected a plain argument name"));
            };
            let slot = match ident.to_string().as_str() {
                "stage" => &mut stage,
                "work_id" => &mut work_id,
                "segment" => &mut segment,
                "tile" => &mut tile,
                "input" => &mut input,
                "output" => &mut output,
                other => {
                    return Err(syn::Error::new_spanned(
                        ident,
                        format!(
                            "unknown argument `{other}`, expected one of: stage, work_id, segment, tile, input, output"
                        ),
                    ));
                }
            };
            if slot.replace(pair.value).is_some() {
                return Err(syn::Error::new_spanned(ident, "duplicate argument"));
            }
        }

        let missing = |name: &str| {
            syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("missing required argument `{name}`"),
            )
        };

        Ok(Self {
            stage: stage.ok_or_else(|| missing("stage"))?,
            work_id: work_id.ok_or_else(|| missing("work_id"))?,
            segment,
            tile,
            input,
            output,
        })
    }
}

/// Records each call of the function as one unit of work of a pipeline
/// stage.
///
/// `stage` and `work_id` are required; `segment`, `tile`, `input` and
/// `output` default to 0. Argument values are ordinary expressions and may
/// refer to the function's parameters.
#[proc_macro_attribute]
pub fn measure_stage(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match StageArgs::parse(attr) {
        Ok(args) => args,
        Err(e) => return e.to_compile_error().into(),
    };
    let input = parse_macro_input!(item as ItemFn);
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    let zero: Expr = syn::parse_quote!(0);
    let stage = &args.stage;
    let work_id = &args.work_id;
    let segment = args.segment.as_ref().unwrap_or(&zero);
    let tile = args.tile.as_ref().unwrap_or(&zero);
    let input_kind = args.input.as_ref().unwrap_or(&zero);
    let output_kind = args.output.as_ref().unwrap_or(&zero);

    let guard = quote! {
        let _encprobe_stage = encprobe::StageGuard::new(
            #stage,
            #input_kind,
            #output_kind,
            #work_id,
            #segment,
            #tile,
        );
    };

    let output = if sig.asyncness.is_some() {
        quote! {
            #(#attrs)*
            #vis #sig {
                async {
                    #guard
                    #block
                }.await
            }
        }
    } else {
        quote! {
            #(#attrs)*
            #vis #sig {
                #guard
                #block
            }
        }
    };

    output.into()
}
