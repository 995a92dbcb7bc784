use indoc::formatdoc;
use product_catalog::CatalogClientError;
use product_catalog::mutation::MutationError;
use product_catalog::upload::UploadError;
use tracing::trace;

/// Format a failed create, update or delete for the terminal.
pub fn format_mutation_error(err: &MutationError) -> String {
    trace!("formatting mutation error: {err:?}");

    match err {
        MutationError::Validation(errors) => {
            let fields = errors
                .iter()
                .map(|(field, message)| format!("  --{}: {message}", flag_name(field)))
                .collect::<Vec<_>>()
                .join("\n");
            formatdoc! {"
                The product is incomplete:

                {fields}
            "}
        },
        MutationError::DuplicateTitle { title } => formatdoc! {"
            A product with the title '{title}' already exists.

            Titles must be unique, choose a different title.
        "},
        MutationError::Request(err) => format_client_error(err),
        MutationError::Unknown(message) => {
            format!("Unexpected response from the product API: {message}")
        },
    }
}

/// Format a failed request against the product API for the terminal.
pub fn format_client_error(err: &CatalogClientError) -> String {
    trace!("formatting client error: {err:?}");

    match err {
        CatalogClientError::Transport(_) => formatdoc! {"
            {}

            Check your network connection and the configured 'catalog_url'.
        ", display_chain(err)},
        CatalogClientError::Status { status, .. } if status.as_u16() == 401 || status.as_u16() == 403 => {
            formatdoc! {"
                The product API refused the request ({status}).

                Set a valid 'auth_token' in your configuration.
            "}
        },
        CatalogClientError::Status { status, .. } if status.as_u16() == 404 => {
            "Product not found.".to_string()
        },
        _ => display_chain(err),
    }
}

/// Format a failed image upload for the terminal.
pub fn format_upload_error(err: &UploadError) -> String {
    trace!("formatting upload error: {err:?}");

    match err {
        UploadError::NotConfigured => formatdoc! {"
            No image upload endpoint configured.

            Set 'upload_url' in your configuration or '$CATALOG_ADMIN_UPLOAD_URL',
            or attach an existing image with '--image-url'.
        "},
        UploadError::Status { status, .. } => {
            format!("The image upload endpoint rejected the image ({status}).")
        },
        _ => display_chain(err),
    }
}

fn flag_name(field: product_catalog::mutation::Field) -> &'static str {
    use product_catalog::mutation::Field;
    match field {
        Field::Title => "title",
        Field::Price => "price",
        Field::Description => "description",
        Field::CategoryId => "category-id",
        Field::Images => "image",
    }
}

pub fn display_chain(mut err: &dyn std::error::Error) -> String {
    let mut fmt = err.to_string();
    while let Some(source) = err.source() {
        fmt = format!("{fmt}: {source}");
        err = source;
    }

    fmt
}
