//! Plain text rendering of products for the terminal.

use std::fmt::{self, Display};

use indoc::writedoc;
use itertools::Itertools;
use product_catalog::Product;
use product_catalog::query::QueryState;

const MAX_TITLE_WIDTH: usize = 40;

/// A table with one row per product.
pub struct DisplayProducts<'a>(pub &'a [Product]);

impl Display for DisplayProducts<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self
            .0
            .iter()
            .map(|product| {
                [
                    product.id.to_string(),
                    shorten(&product.title, MAX_TITLE_WIDTH),
                    product.price.clone(),
                    product.thumbnail().unwrap_or("-").to_string(),
                ]
            })
            .collect::<Vec<_>>();

        let header = ["ID", "TITLE", "PRICE", "IMAGE"].map(str::to_string);
        let mut widths = header.clone().map(|column| column.chars().count());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        for row in std::iter::once(&header).chain(&rows) {
            let line = row
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .join("  ");
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

/// All fields of a single product.
pub struct DisplayProduct<'a>(pub &'a Product);

impl Display for DisplayProduct<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let product = self.0;
        let description = if product.description.is_empty() {
            "-"
        } else {
            &product.description
        };
        writedoc!(
            f,
            "
            {title} (id {id})
              price:       {price}
              description: {description}
            ",
            title = product.title,
            id = product.id,
            price = product.price,
        )?;
        if let Some(category) = &product.category {
            writeln!(f, "  category:    {} (id {})", category.name, category.id)?;
        }
        if product.images.is_empty() {
            writeln!(f, "  images:      -")?;
        } else {
            writeln!(f, "  images:")?;
            for image in &product.images {
                writeln!(f, "    {image}")?;
            }
        }
        Ok(())
    }
}

/// "Page 2 of 3 (23 products matching 'shirt')"
pub struct DisplayPageSummary<'a>(pub &'a QueryState);

impl Display for DisplayPageSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query = self.0;
        let noun = if query.total_matches() == 1 {
            "product"
        } else {
            "products"
        };
        write!(
            f,
            "Page {} of {} ({} {noun}",
            query.page_index(),
            query.total_pages().max(1),
            query.total_matches(),
        )?;
        if let Some(title) = query.filter().title() {
            write!(f, " matching '{title}'")?;
        }
        write!(f, ")")
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(max_chars - 3).collect();
    shortened.push_str("...");
    shortened
}
