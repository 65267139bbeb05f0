use super::{PostMutation, PostQuery, RecordStore, UpdateOutcome, UserFilter, UserMutation};
use crate::domain::{Comment, Location, NewComment, NewPost, Post, User};
use crate::error::ServiceResult;
use sqlx::PgPool;
use uuid::Uuid;

const POST_COLUMNS: &str =
    "id, author_id, text, image, likes_list, saves_list, comments_count, created_at, seq";
const USER_COLUMNS: &str = "id, login, name, about, country, city, avatar, is_private, \
     followers, followings, black_list, saved_posts";
const COMMENT_COLUMNS: &str = "id, author_id, post_id, text, created_at, seq";

/// PostgreSQL record store.
///
/// Every mutation is one statement. Guards live in the `WHERE` clause, which
/// PostgreSQL re-evaluates after taking the row lock, so a concurrent
/// add-if-absent on the same row loses cleanly instead of appending twice.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    login: String,
    name: String,
    about: String,
    country: String,
    city: String,
    avatar: Option<String>,
    is_private: bool,
    followers: Vec<Uuid>,
    followings: Vec<Uuid>,
    black_list: Vec<Uuid>,
    saved_posts: Vec<Uuid>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            login: row.login,
            name: row.name,
            about: row.about,
            location: Location {
                country: row.country,
                city: row.city,
            },
            avatar: row.avatar,
            is_private: row.is_private,
            followers: row.followers,
            followings: row.followings,
            black_list: row.black_list,
            saved_posts: row.saved_posts,
        }
    }
}

/// (SET clause, guard, bound post id) for a user mutation; `$2` is the post id
fn user_mutation_sql(mutation: &UserMutation) -> (&'static str, &'static str, Uuid) {
    match mutation {
        UserMutation::PushSavedPost(post_id) => (
            "saved_posts = array_append(saved_posts, $2)",
            "NOT ($2 = ANY(saved_posts))",
            *post_id,
        ),
        UserMutation::PullSavedPost(post_id) => (
            "saved_posts = array_remove(saved_posts, $2)",
            "$2 = ANY(saved_posts)",
            *post_id,
        ),
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run embedded schema migrations
    pub async fn migrate(&self) -> ServiceResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn post_exists(&self, post_id: Uuid) -> ServiceResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn user_exists(&self, user_id: Uuid) -> ServiceResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Guarded set append; distinguishes a lost guard from a missing row
    async fn add_to_post_set(
        &self,
        post_id: Uuid,
        column: &'static str,
        user_id: Uuid,
    ) -> ServiceResult<UpdateOutcome> {
        let query = format!(
            "UPDATE posts SET {column} = array_append({column}, $2) \
             WHERE id = $1 AND NOT ($2 = ANY({column})) RETURNING id"
        );
        let updated: Option<Uuid> = sqlx::query_scalar(&query)
            .bind(post_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        if updated.is_some() {
            Ok(UpdateOutcome::Applied)
        } else if self.post_exists(post_id).await? {
            Ok(UpdateOutcome::Unchanged)
        } else {
            Ok(UpdateOutcome::Missing)
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for PgStore {
    async fn get_user(&self, user_id: Uuid) -> ServiceResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn find_users(&self, user_ids: &[Uuid]) -> ServiceResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn insert_user(&self, user: User) -> ServiceResult<()> {
        user.validate()?;
        sqlx::query(
            r#"
            INSERT INTO users (id, login, name, about, country, city, avatar, is_private,
                               followers, followings, black_list, saved_posts)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(user.id)
        .bind(&user.login)
        .bind(&user.name)
        .bind(&user.about)
        .bind(&user.location.country)
        .bind(&user.location.city)
        .bind(&user.avatar)
        .bind(user.is_private)
        .bind(&user.followers)
        .bind(&user.followings)
        .bind(&user.black_list)
        .bind(&user.saved_posts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        mutation: UserMutation,
    ) -> ServiceResult<UpdateOutcome> {
        let (set_clause, guard, post_id) = user_mutation_sql(&mutation);
        let query = format!("UPDATE users SET {set_clause} WHERE id = $1 AND {guard}");
        let affected = sqlx::query(&query)
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected > 0 {
            Ok(UpdateOutcome::Applied)
        } else if self.user_exists(user_id).await? {
            Ok(UpdateOutcome::Unchanged)
        } else {
            Ok(UpdateOutcome::Missing)
        }
    }

    async fn update_users_where(
        &self,
        filter: UserFilter,
        mutation: UserMutation,
    ) -> ServiceResult<u64> {
        let (set_clause, guard, post_id) = user_mutation_sql(&mutation);
        // Containment keeps the GIN index on saved_posts usable
        let (predicate, filter_value) = match filter {
            UserFilter::SavedPostsContains(id) => ("saved_posts @> ARRAY[$1]::uuid[]", id),
        };
        let query = format!("UPDATE users SET {set_clause} WHERE {predicate} AND {guard}");
        let affected = sqlx::query(&query)
            .bind(filter_value)
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }

    async fn get_post(&self, post_id: Uuid) -> ServiceResult<Option<Post>> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn find_posts_by_ids(&self, post_ids: &[Uuid]) -> ServiceResult<Vec<Post>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ANY($1)");
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(post_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn find_posts(&self, query: PostQuery) -> ServiceResult<Vec<Post>> {
        // LIMIT NULL is LIMIT ALL
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE ($1::uuid IS NULL OR author_id = $1) \
             ORDER BY created_at DESC, seq DESC \
             LIMIT $2"
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(query.author_id)
            .bind(query.limit.map(|l| l as i64))
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn insert_post(&self, post: NewPost) -> ServiceResult<Post> {
        let query = format!(
            "INSERT INTO posts (id, author_id, text, image, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {POST_COLUMNS}"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(post.id)
            .bind(post.author_id)
            .bind(post.text)
            .bind(post.image)
            .bind(post.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(post)
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        mutation: PostMutation,
    ) -> ServiceResult<UpdateOutcome> {
        let result = match mutation {
            PostMutation::AddLike(user_id) => {
                return self.add_to_post_set(post_id, "likes_list", user_id).await;
            }
            PostMutation::AddSave(user_id) => {
                return self.add_to_post_set(post_id, "saves_list", user_id).await;
            }
            PostMutation::IncrementComments(delta) => {
                sqlx::query(
                    "UPDATE posts SET comments_count = GREATEST(comments_count + $2, 0) \
                     WHERE id = $1",
                )
                .bind(post_id)
                .bind(delta)
                .execute(&self.pool)
                .await?
            }
            PostMutation::Edit { text, image } => {
                sqlx::query("UPDATE posts SET text = $2, image = COALESCE($3, image) WHERE id = $1")
                    .bind(post_id)
                    .bind(text)
                    .bind(image)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() > 0 {
            Ok(UpdateOutcome::Applied)
        } else {
            Ok(UpdateOutcome::Missing)
        }
    }

    async fn delete_post(&self, post_id: Uuid) -> ServiceResult<bool> {
        let affected = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn get_comment(&self, comment_id: Uuid) -> ServiceResult<Option<Comment>> {
        let query = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn find_comments_by_post(&self, post_id: Uuid) -> ServiceResult<Vec<Comment>> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 \
             ORDER BY created_at ASC, seq ASC"
        );
        let comments = sqlx::query_as::<_, Comment>(&query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn insert_comment(&self, comment: NewComment) -> ServiceResult<Comment> {
        let query = format!(
            "INSERT INTO comments (id, author_id, post_id, text, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COMMENT_COLUMNS}"
        );
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(comment.id)
            .bind(comment.author_id)
            .bind(comment.post_id)
            .bind(comment.text)
            .bind(comment.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> ServiceResult<bool> {
        let affected = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn delete_comments_by_post(&self, post_id: Uuid) -> ServiceResult<u64> {
        let affected = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }

    async fn health_check(&self) -> ServiceResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
