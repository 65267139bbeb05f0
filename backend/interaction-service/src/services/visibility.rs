use uuid::Uuid;

/// Whether `viewer_id` may see posts written by `author_id`.
///
/// Only the author's block list is consulted. `User::is_private` is carried as
/// data; follow-gating happens outside this service.
pub fn can_view(viewer_id: Uuid, _author_id: Uuid, author_black_list: &[Uuid]) -> bool {
    !author_black_list.contains(&viewer_id)
}
