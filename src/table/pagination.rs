use crate::driver::{Item, QueryRequest, StoreDriver};
use crate::entity::Entity;
use crate::error::Error;
use crate::expression::generate_expression;
use crate::keys::load_keys_and_convert_to_map;
use crate::marshal::unmarshal_items;
use crate::table::{Cursor, Page, TableClient};

impl<D: StoreDriver> TableClient<D> {
    /// One exact-size page of the items matching the populated fields of `entity`
    ///
    /// Native store pages are pulled until `page_limit` items are collected or the
    /// listing is exhausted, so every page but the last holds exactly `page_limit` items.
    /// Resume with the returned [`Page::next_cursor`]. A failed page fetch returns
    /// [`Error::Pagination`] carrying `cursor`, which is still a valid resume point.
    pub async fn get_records_by_pagination<E: Entity>(
        &self,
        entity: &mut E,
        page_limit: usize,
        cursor: Option<Cursor>,
        scan_forward: bool,
    ) -> Result<Page<E>, Error> {
        let page_limit = page_limit.max(1);
        let criteria = load_keys_and_convert_to_map(entity)?;
        let expression = generate_expression(Some(&criteria), None, None)?;
        let table = entity.table_name();

        let mut collected: Vec<Item> = Vec::new();
        let mut start_key = cursor.as_ref().map(Cursor::exclusive_start_key);

        let next_cursor = loop {
            let request = QueryRequest {
                table: table.clone(),
                expression: expression.clone(),
                limit: Some(page_limit.min(i32::MAX as usize) as i32),
                scan_forward,
                consistent_read: false,
                exclusive_start_key: start_key.take(),
            };

            let page = match self.driver.query(request).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(table = %table, error = %err, "page fetch failed");
                    return Err(Error::Pagination {
                        cursor,
                        source: Box::new(err),
                    });
                }
            };

            let remaining = page_limit - collected.len();
            if page.items.len() >= remaining {
                let more = page.items.len() > remaining || page.last_evaluated_key.is_some();
                collected.extend(page.items.into_iter().take(remaining));
                break if more {
                    collected.last().and_then(Cursor::from_item)
                } else {
                    None
                };
            }

            collected.extend(page.items);

            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break None,
            }
        };

        Ok(Page {
            items: unmarshal_items(collected)?,
            next_cursor,
        })
    }
}
