use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::configuration::Settings;
use crate::logger::LoggerMiddleware;
use crate::middleware::{methods, AuthInterceptor, AuthMiddleware, MethodTable};
use crate::routes::{
    change_role, get_profile, health_check, list_users, login, logout, refresh_token, register,
};
use crate::services::{CredentialService, CredentialSettings, CredentialStores, ProfileService};
use crate::store::{
    AdminFunctions, ProfileProvider, RoleProvider, RoleSetter, TokenRepo, UserProvider, UserSaver,
};

/// Everything the HTTP layer needs, wired once at startup
#[derive(Clone)]
pub struct Services {
    pub credentials: CredentialService,
    pub profiles: ProfileService,
    pub interceptor: Arc<AuthInterceptor>,
}

impl Services {
    pub fn from_store<S>(store: Arc<S>, settings: &Settings) -> Self
    where
        S: UserSaver
            + UserProvider
            + RoleSetter
            + RoleProvider
            + TokenRepo
            + ProfileProvider
            + AdminFunctions
            + 'static,
    {
        let codec = TokenCodec::from_settings(&settings.jwt);

        Self {
            credentials: CredentialService::new(
                CredentialStores::from_store(store.clone()),
                codec.clone(),
                CredentialSettings::from_settings(settings),
            ),
            profiles: ProfileService::from_store(store),
            interceptor: Arc::new(AuthInterceptor::new(MethodTable::user_service(), codec)),
        }
    }
}

pub fn run(listener: TcpListener, services: Services) -> Result<Server, std::io::Error> {
    let credentials = web::Data::new(services.credentials);
    let profiles = web::Data::new(services.profiles);
    let interceptor = services.interceptor;

    let server = HttpServer::new(move || {
        App::new()
            // Every call passes the interceptor; public methods are waved through
            .wrap(AuthMiddleware::new(interceptor.clone()))
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(credentials.clone())
            .app_data(profiles.clone())

            .route(methods::HEALTH_CHECK, web::get().to(health_check))
            .route(methods::REGISTER, web::post().to(register))
            .route(methods::LOGIN, web::post().to(login))
            .route(methods::REFRESH_TOKEN, web::post().to(refresh_token))
            .route(methods::LOGOUT, web::post().to(logout))
            .route(methods::GET_PROFILE, web::post().to(get_profile))
            .route(methods::LIST_USERS, web::post().to(list_users))
            .route(methods::CHANGE_ROLE, web::post().to(change_role))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
