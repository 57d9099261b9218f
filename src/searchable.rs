type SearchableFn<T> = dyn FnMut(&T, &str) -> bool;

/// A list with a live filter over it.
///
/// Filtering keeps the positions of matching items, so the items themselves
/// are never cloned.
pub struct Searchable<T> {
    vec: Vec<T>,

    filter: Box<SearchableFn<T>>,
    query: String,
    filtered: Vec<usize>,
}

impl<T> Searchable<T> {
    #[must_use]
    pub fn new<P>(vec: Vec<T>, search_value: &str, predicate: P) -> Self
    where
        P: FnMut(&T, &str) -> bool + 'static,
    {
        let mut searchable = Self {
            vec,

            filter: Box::new(predicate),
            query: String::new(),
            filtered: Vec::new(),
        };
        searchable.search(search_value);
        searchable
    }

    pub fn search(&mut self, value: &str) {
        value.clone_into(&mut self.query);

        if value.is_empty() {
            self.filtered = (0..self.vec.len()).collect();
            return;
        }

        let filter = &mut self.filter;
        self.filtered = self
            .vec
            .iter()
            .enumerate()
            .filter(|(_, item)| filter(*item, value))
            .map(|(i, _)| i)
            .collect();
    }

    #[allow(clippy::must_use_candidate)]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[allow(clippy::must_use_candidate)]
    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    #[allow(clippy::must_use_candidate)]
    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    #[allow(clippy::must_use_candidate)]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.filtered.get(index).map(|&i| &self.vec[i])
    }

    /// Every item, ignoring the filter.
    pub fn non_filtered_iter(&self) -> std::slice::Iter<T> {
        self.vec.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.filtered.iter().map(|&i| &self.vec[i])
    }
}

impl<T> std::ops::Index<usize> for Searchable<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.vec[self.filtered[index]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words() -> Searchable<&'static str> {
        Searchable::new(vec!["alpha", "beta", "alphabet"], "", |item, value| {
            item.contains(value)
        })
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let searchable = words();

        assert_eq!(searchable.len(), 3);
        assert_eq!(
            searchable.iter().copied().collect::<Vec<_>>(),
            vec!["alpha", "beta", "alphabet"]
        );
    }

    #[test]
    fn test_search_filters_in_order() {
        let mut searchable = words();
        searchable.search("alpha");

        assert_eq!(searchable.query(), "alpha");
        assert_eq!(searchable.len(), 2);
        assert_eq!(searchable[1], "alphabet");
        assert_eq!(searchable.get(2), None);
        assert_eq!(searchable.non_filtered_iter().count(), 3);
    }

    #[test]
    fn test_search_without_matches() {
        let mut searchable = words();
        searchable.search("gamma");

        assert!(searchable.is_empty());

        searchable.search("");
        assert_eq!(searchable.len(), 3);
    }
}
