// Default capability table: permission -> roles granted it
use crate::role::Role::{self, Admin, Agency, Caregiver, Guardian, Moderator, Patient, Shop};

pub(crate) const DEFAULT_RESOURCE_PERMISSIONS: &[(&str, &[Role])] = &[
    // User management
    ("users:read", &[Admin, Moderator]),
    ("users:write", &[Admin]),
    ("users:delete", &[Admin]),
    // Agency management
    ("agencies:read", &[Admin, Moderator]),
    ("agencies:write", &[Admin, Agency]),
    ("agencies:verify", &[Admin, Moderator]),
    // Shop management
    ("shops:read", &[Admin, Moderator]),
    ("shops:write", &[Admin, Shop]),
    ("shops:verify", &[Admin, Moderator]),
    // Caregiver management
    ("caregivers:read", &[Admin, Moderator, Agency]),
    ("caregivers:write", &[Admin, Agency]),
    ("caregivers:verify", &[Admin, Moderator]),
    ("caregivers:assign", &[Admin, Agency]),
    // Patient management
    ("patients:read", &[Admin, Moderator, Agency, Guardian, Caregiver]),
    ("patients:write", &[Admin, Agency, Guardian]),
    ("patients:own:read", &[Guardian, Patient, Caregiver]),
    ("patients:own:write", &[Guardian]),
    // Job management
    ("jobs:read", &[Admin, Moderator, Agency, Guardian, Caregiver]),
    ("jobs:write", &[Admin, Agency, Guardian]),
    ("jobs:assign", &[Admin, Agency]),
    ("jobs:own:read", &[Guardian, Caregiver]),
    ("jobs:assigned:read", &[Caregiver]),
    // Products and orders
    ("products:read", &[Admin, Moderator, Shop, Agency, Guardian, Caregiver]),
    ("products:write", &[Admin, Shop]),
    ("orders:read", &[Admin, Moderator, Shop]),
    ("orders:write", &[Admin, Guardian, Agency]),
    ("orders:fulfil", &[Admin, Shop]),
    ("orders:own:read", &[Guardian, Agency, Shop]),
    // Payment management
    ("payments:read", &[Admin, Moderator, Agency, Guardian]),
    ("payments:write", &[Admin, Agency, Guardian]),
    ("payments:own:read", &[Guardian, Caregiver, Shop]),
    ("payments:process", &[Admin, Agency]),
    // Care logs
    ("care_logs:read", &[Admin, Moderator, Agency, Guardian, Caregiver]),
    ("care_logs:write", &[Admin, Agency, Guardian, Caregiver]),
    ("care_logs:own:read", &[Guardian, Patient, Caregiver]),
    ("care_logs:create", &[Caregiver]),
    // Feedback and ratings
    ("feedback:read", &[Admin, Moderator, Agency, Guardian, Caregiver]),
    ("feedback:write", &[Admin, Agency, Guardian, Caregiver]),
    ("feedback:moderate", &[Admin, Moderator]),
    // Dispute management
    ("disputes:read", &[Admin, Moderator, Agency, Guardian, Caregiver]),
    ("disputes:write", &[Admin, Moderator, Agency, Guardian, Caregiver]),
    ("disputes:resolve", &[Admin, Moderator]),
    // Analytics and reports
    ("analytics:read", &[Admin, Moderator, Agency]),
    ("analytics:own:read", &[Agency, Shop]),
    // System management
    ("system:read", &[Admin]),
    ("system:write", &[Admin]),
    ("system:config", &[Admin]),
];
