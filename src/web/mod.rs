//! Interactive HTML pages for browsing and editing the catalog

pub mod forms;
pub mod views;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::convert::Infallible;
use validator::{Validate, ValidationErrors};

use crate::{
    api::session_token,
    error::AppError,
    models::{
        book::{BookFilter, BookInput, BookQuery, NewBook},
        user::UserClaims,
    },
    services::uniqueness::taken_error,
    AppState,
};

use forms::{BookForm, FieldErrors, LoginForm};
use views::ListFilters;

/// Session principal, if any. Never rejects: invalid or expired sessions read as anonymous.
pub struct CurrentUser(pub Option<UserClaims>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = session_token(parts, &state.config.auth.cookie_name)
            .and_then(|token| state.services.auth.decode(&token).ok());
        Ok(CurrentUser(claims))
    }
}

impl CurrentUser {
    fn claims(&self) -> Option<&UserClaims> {
        self.0.as_ref()
    }

    /// Adding books: ADMIN or USER
    fn require_editor(&self) -> Result<&UserClaims, WebError> {
        let claims = self.0.as_ref().ok_or(WebError::Login)?;
        claims.require_catalog_editor()?;
        Ok(claims)
    }

    /// Editing and deleting books: ADMIN only
    fn require_admin(&self) -> Result<&UserClaims, WebError> {
        let claims = self.0.as_ref().ok_or(WebError::Login)?;
        claims.require_admin()?;
        Ok(claims)
    }
}

/// Page-level failures, rendered as redirects or HTML rather than JSON
#[derive(Debug)]
pub enum WebError {
    /// No session: send the browser to the login page
    Login,
    Forbidden,
    /// Missing record: back to the list
    NotFound,
    App(AppError),
}

impl From<AppError> for WebError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Authentication(_) => WebError::Login,
            AppError::Authorization(_) => WebError::Forbidden,
            AppError::NotFound(msg) => {
                tracing::warn!("{}", msg);
                WebError::NotFound
            }
            other => WebError::App(other),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::Login => Redirect::to("/login").into_response(),
            WebError::Forbidden => (
                StatusCode::FORBIDDEN,
                Html(views::error_page(403, "You are not allowed to do that.", None)),
            )
                .into_response(),
            WebError::NotFound => Redirect::to("/books").into_response(),
            WebError::App(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    tracing::error!("Page request failed: {}", err);
                }
                (
                    status,
                    Html(views::error_page(status.as_u16(), &err.public_message(), None)),
                )
                    .into_response()
            }
        }
    }
}

type WebResult<T> = Result<T, WebError>;

/// Routes for the interactive surface
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/books") }))
        .route("/books", get(list_books))
        .route("/books/new", get(new_book_form))
        .route("/books/save", post(save_book))
        .route("/books/edit/:id", get(edit_book_form))
        .route("/books/update/:id", post(update_book))
        .route("/books/delete/:id", get(delete_book).post(delete_book))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout).post(logout))
}

async fn list_books(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<BookQuery>,
) -> WebResult<Html<String>> {
    tracing::info!(
        title = ?query.title,
        brand = ?query.brand,
        year = ?query.year,
        "Listing books page"
    );
    if let Some(claims) = user.claims() {
        tracing::debug!(username = claims.username(), "Authenticated catalog view");
    }

    let catalog = &state.services.catalog;
    let filter = BookFilter::new(query.title.as_deref(), query.brand.as_deref(), query.year);
    let page = catalog
        .search(&filter, catalog.page_request(query.page, query.size))
        .await?;

    let filters = ListFilters {
        title: filter.title.clone(),
        brand: filter.brand.clone(),
        year: filter.year,
    };
    Ok(Html(views::book_list(&page, &filters, user.claims())))
}

async fn new_book_form(user: CurrentUser) -> WebResult<Html<String>> {
    let claims = user.require_editor()?;
    tracing::info!("New book form requested");
    Ok(Html(views::book_form(
        None,
        &BookForm::default(),
        &FieldErrors::default(),
        Some(claims),
    )))
}

/// Required-field checks plus the vendor code uniqueness check
async fn validate_form(
    state: &AppState,
    form: &BookForm,
    exclude_id: Option<i64>,
) -> WebResult<(BookInput, FieldErrors)> {
    let mut parse_errors = ValidationErrors::new();
    let input = form.parse(&mut parse_errors);

    let mut errors = input.validate().err().unwrap_or_else(ValidationErrors::new);
    state
        .services
        .catalog
        .vendor_codes()
        .validate(&input, exclude_id, &mut errors)
        .await?;

    // A field that failed to parse reports that instead of "is required"
    let mut field_errors = FieldErrors::from(&errors);
    field_errors.override_with(FieldErrors::from(&parse_errors));
    if !field_errors.is_empty() {
        tracing::warn!(?field_errors, "Book form validation failed");
    }
    Ok((input, field_errors))
}

fn conflict_form(book_id: Option<i64>, form: &BookForm, claims: &UserClaims) -> Html<String> {
    let mut errors = ValidationErrors::new();
    errors.add("vendor_code", taken_error());
    Html(views::book_form(
        book_id,
        form,
        &FieldErrors::from(&errors),
        Some(claims),
    ))
}

async fn save_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<BookForm>,
) -> WebResult<Response> {
    let claims = user.require_editor()?;
    tracing::info!(title = %form.title, "Saving new book");

    let (input, errors) = validate_form(&state, &form, None).await?;
    if !errors.is_empty() {
        return Ok(Html(views::book_form(None, &form, &errors, Some(claims))).into_response());
    }

    match state.services.catalog.create(NewBook::try_from(input)?).await {
        Ok(book) => {
            tracing::info!(id = book.id, "Book saved");
            Ok(Redirect::to("/books").into_response())
        }
        Err(AppError::Conflict(_)) => Ok(conflict_form(None, &form, claims).into_response()),
        Err(e) => Err(e.into()),
    }
}

async fn edit_book_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> WebResult<Html<String>> {
    let claims = user.require_admin()?;
    tracing::info!(id, "Edit book form requested");

    let book = state.services.catalog.get_by_id(id).await?;
    Ok(Html(views::book_form(
        Some(id),
        &BookForm::from(&book),
        &FieldErrors::default(),
        Some(claims),
    )))
}

async fn update_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<BookForm>,
) -> WebResult<Response> {
    let claims = user.require_admin()?;
    tracing::info!(id, "Updating book");

    let (input, errors) = validate_form(&state, &form, Some(id)).await?;
    if !errors.is_empty() {
        return Ok(Html(views::book_form(Some(id), &form, &errors, Some(claims))).into_response());
    }

    match state.services.catalog.update(id, &input).await {
        Ok(book) => {
            tracing::info!(id = book.id, "Book updated from form");
            Ok(Redirect::to("/books").into_response())
        }
        Err(AppError::Conflict(_)) => Ok(conflict_form(Some(id), &form, claims).into_response()),
        Err(e) => Err(e.into()),
    }
}

async fn delete_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> WebResult<Redirect> {
    user.require_admin()?;
    tracing::info!(id, "Deleting book");

    state.services.catalog.delete(id).await?;
    Ok(Redirect::to("/books"))
}

#[derive(Debug, Default, Deserialize)]
struct LoginPageParams {
    logout: Option<String>,
}

async fn login_form(Query(params): Query<LoginPageParams>) -> Html<String> {
    Html(views::login(None, params.logout.is_some()))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.services.auth.login(&form.username, &form.password).await {
        Ok((_, token)) => {
            let cookie = Cookie::build((state.config.auth.cookie_name.clone(), token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), Redirect::to("/books")).into_response()
        }
        Err(AppError::Authentication(msg)) => (
            StatusCode::UNAUTHORIZED,
            Html(views::login(Some(&msg), false)),
        )
            .into_response(),
        Err(e) => WebError::from(e).into_response(),
    }
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let cookie = Cookie::build((state.config.auth.cookie_name.clone(), "")).path("/");
    (jar.remove(cookie), Redirect::to("/books?logout"))
}
