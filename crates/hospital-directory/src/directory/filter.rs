use super::domain::HospitalSummary;

/// Local speciality filter over an already fetched hospital set.
///
/// An empty query keeps every hospital. Otherwise a hospital is kept when at
/// least one of its specialities contains the query, ignoring case. Input
/// order is preserved.
pub fn filter_by_speciality(hospitals: &[HospitalSummary], query: &str) -> Vec<HospitalSummary> {
    if query.is_empty() {
        return hospitals.to_vec();
    }

    hospitals
        .iter()
        .filter(|hospital| hospital.offers_speciality(query))
        .cloned()
        .collect()
}
