use serde::Serialize;

use crate::entities::resume::TestimonialView;
use crate::settings::PersonalProfile;

#[derive(Debug, Clone, Serialize)]
pub struct SocialLinks {
    pub github: String,
    pub tryhackme: String,
    pub hackthebox: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub full_name: String,
    pub email: String,
    pub tagline: String,
    pub phone: String,
    pub location: String,
    pub social: SocialLinks,
}

impl From<&PersonalProfile> for ProfileView {
    fn from(profile: &PersonalProfile) -> Self {
        ProfileView {
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            tagline: profile.tagline.clone(),
            phone: profile.phone.clone(),
            location: profile.location.clone(),
            social: SocialLinks {
                github: profile.github_url(),
                tryhackme: profile.tryhackme_url(),
                hackthebox: profile.hackthebox_url(),
                email: profile.email_url(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeResponse {
    pub profile: ProfileView,
    pub testimonials: Vec<TestimonialView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AboutResponse {
    pub profile: ProfileView,
}
